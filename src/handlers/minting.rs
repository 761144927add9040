use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::BadgeType;
use crate::services::minting;
use crate::services::minting::BatchMintInput;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMintingApprovalRequest {
    pub attendee_ids: Vec<Uuid>,
    pub approved: bool,
}

#[derive(Serialize)]
struct MintingApprovalResult {
    updated: u64,
}

pub async fn set_minting_approval(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SetMintingApprovalRequest>,
) -> Result<Response, AppError> {
    let updated = minting::set_minting_approval(
        &state.pool,
        &caller,
        event_id,
        &req.attendee_ids,
        req.approved,
    )
    .await?;
    Ok(success(MintingApprovalResult { updated }, "Minting approval updated").into_response())
}

pub async fn claim_badge(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome = minting::claim_badge(
        &state.pool,
        state.chain.as_ref(),
        &state.config,
        &caller,
        event_id,
    )
    .await?;
    Ok(success(outcome, "Badge claimed").into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMintRequest {
    #[serde(default)]
    pub attendee_ids: Vec<Uuid>,
    #[serde(default)]
    pub addresses: Vec<String>,
    pub badge_type: BadgeType,
    pub badge_image: Option<String>,
}

/// Always answers 200 with one itemized outcome per recipient; chain
/// failures never fail the request as a whole.
pub async fn batch_mint(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<BatchMintRequest>,
) -> Result<Response, AppError> {
    let outcomes = minting::batch_mint(
        &state.pool,
        state.chain.as_ref(),
        &state.config,
        &caller,
        event_id,
        BatchMintInput {
            attendee_ids: req.attendee_ids,
            addresses: req.addresses,
            badge_type: req.badge_type,
            badge_image: req.badge_image,
        },
    )
    .await?;
    Ok(success(outcomes, "Batch mint processed").into_response())
}
