use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{InviteStatus, JoinRequestStatus, RsvpStatus};
use crate::services::engagement;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct SetRsvpRequest {
    pub status: RsvpStatus,
}

pub async fn set_rsvp(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SetRsvpRequest>,
) -> Result<Response, AppError> {
    let rsvp = engagement::set_rsvp(&state.pool, &caller, event_id, req.status).await?;
    Ok(success(rsvp, "RSVP recorded").into_response())
}

#[derive(Deserialize)]
pub struct CreateJoinRequestRequest {
    pub message: Option<String>,
}

pub async fn create_join_request(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<CreateJoinRequestRequest>,
) -> Result<Response, AppError> {
    let request =
        engagement::create_join_request(&state.pool, &caller, event_id, req.message.as_deref())
            .await?;
    Ok(created(request, "Join request submitted").into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondJoinRequestRequest {
    pub user_id: Uuid,
    pub status: JoinRequestStatus,
}

pub async fn respond_join_request(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<RespondJoinRequestRequest>,
) -> Result<Response, AppError> {
    let request = engagement::respond_join_request(
        &state.pool,
        &caller,
        event_id,
        req.user_id,
        req.status,
    )
    .await?;
    Ok(success(request, "Join request updated").into_response())
}

#[derive(Deserialize)]
pub struct BatchRespondJoinRequestsRequest {
    pub responses: Vec<RespondJoinRequestRequest>,
}

pub async fn batch_respond_join_requests(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<BatchRespondJoinRequestsRequest>,
) -> Result<Response, AppError> {
    let items: Vec<(Uuid, JoinRequestStatus)> = req
        .responses
        .iter()
        .map(|r| (r.user_id, r.status))
        .collect();
    let report =
        engagement::batch_respond_join_requests(&state.pool, &caller, event_id, &items).await?;
    Ok(success(report, "Join requests processed").into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub user_id: Uuid,
}

pub async fn create_invite(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<CreateInviteRequest>,
) -> Result<Response, AppError> {
    let invite = engagement::create_invite(&state.pool, &caller, event_id, req.user_id).await?;
    Ok(created(invite, "Invite created").into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateInvitesRequest {
    pub user_ids: Vec<Uuid>,
}

pub async fn batch_create_invites(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<BatchCreateInvitesRequest>,
) -> Result<Response, AppError> {
    let report =
        engagement::batch_create_invites(&state.pool, &caller, event_id, &req.user_ids).await?;
    Ok(success(report, "Invites processed").into_response())
}

#[derive(Deserialize)]
pub struct RespondInviteRequest {
    pub status: InviteStatus,
}

pub async fn respond_invite(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<RespondInviteRequest>,
) -> Result<Response, AppError> {
    let invite = engagement::respond_invite(&state.pool, &caller, event_id, req.status).await?;
    Ok(success(invite, "Invite updated").into_response())
}
