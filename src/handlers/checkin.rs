use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::services::{checkin, entitlement};
use crate::state::AppState;
use crate::store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct CoordsQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl CoordsQuery {
    fn coords(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Read-only status poll: reports every gate and the first failing reason
/// without creating anything.
pub async fn check_in_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Query(query): Query<CoordsQuery>,
) -> Result<Response, AppError> {
    let (event, _) = entitlement::visible_event(&state.pool, event_id, &caller).await?;
    let ctx = checkin::load_context(&state.pool, event.id, caller.id).await?;
    let view = checkin::status_view(&event, Utc::now(), query.coords(), &ctx);
    Ok(success(view, "Check-in status").into_response())
}

/// Manager view of who has checked in, used to drive minting approval.
pub async fn list_attendance(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (event, ent) = entitlement::visible_event(&state.pool, event_id, &caller).await?;
    entitlement::require_manage(&ent)?;
    let rows = store::attendance::list_for_event(&state.pool, event.id).await?;
    Ok(success(rows, "Attendance retrieved").into_response())
}

#[derive(Deserialize)]
pub struct CheckInRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub async fn check_in(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<CheckInRequest>,
) -> Result<Response, AppError> {
    let coords = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };
    let attendance = checkin::check_in(&state.pool, &caller, event_id, coords).await?;
    Ok(created(attendance, "Checked in").into_response())
}
