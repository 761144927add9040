use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::ApprovalStatus;
use crate::services::entitlement;
use crate::state::AppState;
use crate::store;
use crate::store::events::{EventPatch, NewEvent};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub max_attendees: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub badge_image: Option<String>,
}

fn default_public() -> bool {
    true
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

fn validate_geofence(latitude: f64, longitude: f64, radius_m: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::ValidationError("Invalid latitude".to_string()));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::ValidationError("Invalid longitude".to_string()));
    }
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(AppError::ValidationError(
            "Radius must be a positive number of meters".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    axum::Json(req): axum::Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if req.end_time <= req.start_time {
        return Err(AppError::ValidationError(
            "End time must be after start time".to_string(),
        ));
    }
    if matches!(req.max_attendees, Some(n) if n <= 0) {
        return Err(AppError::ValidationError(
            "Attendee cap must be positive".to_string(),
        ));
    }
    validate_geofence(req.latitude, req.longitude, req.radius_m)?;

    let event = store::events::create(
        &state.pool,
        caller.id,
        &NewEvent {
            title: req.title,
            description: req.description,
            is_public: req.is_public,
            max_attendees: req.max_attendees,
            start_time: req.start_time,
            end_time: req.end_time,
            latitude: req.latitude,
            longitude: req.longitude,
            radius_m: req.radius_m,
            badge_image: req.badge_image,
        },
    )
    .await?;

    Ok(created(event, "Event created, pending approval").into_response())
}

pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Response, AppError> {
    let events = store::events::list_visible(&state.pool, &caller).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (event, _) = entitlement::visible_event(&state.pool, event_id, &caller).await?;
    Ok(success(event, "Event retrieved").into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    /// Absent = unchanged; explicit null = remove the cap.
    #[serde(default, deserialize_with = "double_option")]
    pub max_attendees: Option<Option<i32>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_m: Option<f64>,
    pub badge_image: Option<String>,
}

pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    axum::Json(req): axum::Json<UpdateEventRequest>,
) -> Result<Response, AppError> {
    let (event, ent) = entitlement::visible_event(&state.pool, event_id, &caller).await?;
    entitlement::require_manage(&ent)?;

    let latitude = req.latitude.unwrap_or(event.latitude);
    let longitude = req.longitude.unwrap_or(event.longitude);
    let radius_m = req.radius_m.unwrap_or(event.radius_m);
    validate_geofence(latitude, longitude, radius_m)?;

    let updated = store::events::update(
        &state.pool,
        event.id,
        &EventPatch {
            title: req.title,
            description: req.description,
            is_public: req.is_public,
            max_attendees: req.max_attendees,
            start_time: req.start_time,
            end_time: req.end_time,
            latitude: req.latitude,
            longitude: req.longitude,
            radius_m: req.radius_m,
            badge_image: req.badge_image,
        },
    )
    .await?;

    Ok(success(updated, "Event updated").into_response())
}

#[derive(Deserialize)]
pub struct SetApprovalRequest {
    pub status: ApprovalStatus,
}

/// Approval transitions are admin-only; owners cannot approve their own
/// events.
pub async fn set_approval(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    axum::Json(req): axum::Json<SetApprovalRequest>,
) -> Result<Response, AppError> {
    if !caller.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins may change approval status".to_string(),
        ));
    }
    if store::events::find(&state.pool, event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    let event = store::events::set_approval_status(&state.pool, event_id, req.status).await?;
    Ok(success(event, "Approval status updated").into_response())
}

pub async fn get_entitlement(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (_, ent) = entitlement::visible_event(&state.pool, event_id, &caller).await?;
    Ok(success(ent, "Entitlement resolved").into_response())
}
