use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::state::AppState;
use crate::store;
use crate::utils::error::AppError;

/// Serves the token metadata referenced by on-chain URIs. Plain JSON in
/// the shape wallets and marketplaces expect, not the API envelope, and
/// no authentication: the URI is embedded in public chain state.
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(metadata_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let metadata = store::metadata::find(&state.pool, metadata_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Metadata not found".to_string()))?;

    let body = json!({
        "name": metadata.name,
        "description": metadata.description,
        "image": metadata.image,
        "attributes": metadata.attributes,
    });
    Ok(Json(body).into_response())
}
