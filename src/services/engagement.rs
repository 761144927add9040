//! RSVP, invite and join-request workflows. Capacity and one-shot
//! transitions are enforced by conditional writes in the store; this layer
//! owns eligibility and the per-item partial-success contract for batches.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    EventInvite, EventJoinRequest, EventRsvp, InviteStatus, JoinRequestStatus, RsvpStatus, User,
};
use crate::services::entitlement;
use crate::store;
use crate::utils::error::AppError;

/// Partial-success result for batch operations: every item is processed
/// independently and failures never abort the rest.
#[derive(Debug, Serialize)]
pub struct BatchReport<T> {
    pub results: Vec<T>,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub user_id: Uuid,
    pub error: String,
}

// ---------------------------------------------------------------------------
// RSVP

pub async fn set_rsvp(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    status: RsvpStatus,
) -> Result<EventRsvp, AppError> {
    let (event, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    if !ent.can_rsvp {
        return Err(AppError::Forbidden(
            "You are not eligible to RSVP to this event".to_string(),
        ));
    }

    match (status, event.max_attendees) {
        (RsvpStatus::Going, Some(cap)) => {
            store::engagement::upsert_rsvp_going_capped(pool, event.id, caller.id, cap)
                .await?
                .ok_or_else(|| AppError::Conflict("Event is at capacity".to_string()))
        }
        _ => Ok(store::engagement::upsert_rsvp(pool, event.id, caller.id, status).await?),
    }
}

// ---------------------------------------------------------------------------
// Join requests (public events)

pub async fn create_join_request(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    message: Option<&str>,
) -> Result<EventJoinRequest, AppError> {
    let (event, _) = entitlement::visible_event(pool, event_id, caller).await?;
    if !event.is_public {
        return Err(AppError::ValidationError(
            "Join requests apply to public events only".to_string(),
        ));
    }

    store::engagement::create_or_resubmit_join_request(pool, event.id, caller.id, message)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("A join request is already pending or approved".to_string())
        })
}

pub async fn respond_join_request(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    requester_id: Uuid,
    status: JoinRequestStatus,
) -> Result<EventJoinRequest, AppError> {
    let (event, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    entitlement::require_manage(&ent)?;

    if status == JoinRequestStatus::Pending {
        return Err(AppError::ValidationError(
            "Response must be approved or rejected".to_string(),
        ));
    }

    let existing = store::engagement::find_join_request(pool, event.id, requester_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Join request not found".to_string()))?;
    if existing.status != JoinRequestStatus::Pending {
        return Err(AppError::Conflict(
            "Join request has already been responded to".to_string(),
        ));
    }

    // The conditional update re-checks capacity against already-approved
    // requests inside the statement.
    match store::engagement::respond_join_request(
        pool,
        event.id,
        requester_id,
        status,
        event.max_attendees,
    )
    .await?
    {
        Some(request) => Ok(request),
        None => {
            // Zero rows back means either a concurrent response won the
            // race or the capacity re-check failed; re-read to report the
            // right conflict.
            let current = store::engagement::find_join_request(pool, event.id, requester_id).await?;
            match current {
                Some(r) if r.status != JoinRequestStatus::Pending => Err(AppError::Conflict(
                    "Join request has already been responded to".to_string(),
                )),
                _ => Err(AppError::Conflict("Event is at capacity".to_string())),
            }
        }
    }
}

pub async fn batch_respond_join_requests(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    items: &[(Uuid, JoinRequestStatus)],
) -> Result<BatchReport<EventJoinRequest>, AppError> {
    let (_, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    entitlement::require_manage(&ent)?;

    let mut report = BatchReport {
        results: Vec::new(),
        failures: Vec::new(),
    };
    for (requester_id, status) in items {
        match respond_join_request(pool, caller, event_id, *requester_id, *status).await {
            Ok(request) => report.results.push(request),
            Err(e) => report.failures.push(BatchFailure {
                user_id: *requester_id,
                error: e.to_string(),
            }),
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Invites (private events)

pub async fn create_invite(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    invitee_id: Uuid,
) -> Result<EventInvite, AppError> {
    let (event, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    entitlement::require_manage(&ent)?;

    if event.is_public {
        return Err(AppError::ValidationError(
            "Invites apply to private events only".to_string(),
        ));
    }
    if store::users::find_by_id(pool, invitee_id).await?.is_none() {
        return Err(AppError::ValidationError("Unknown user".to_string()));
    }

    store::engagement::create_invite(pool, event.id, invitee_id)
        .await?
        .ok_or_else(|| AppError::Conflict("User is already invited".to_string()))
}

pub async fn batch_create_invites(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    invitee_ids: &[Uuid],
) -> Result<BatchReport<EventInvite>, AppError> {
    let (_, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    entitlement::require_manage(&ent)?;

    let mut report = BatchReport {
        results: Vec::new(),
        failures: Vec::new(),
    };
    for invitee_id in invitee_ids {
        match create_invite(pool, caller, event_id, *invitee_id).await {
            Ok(invite) => report.results.push(invite),
            Err(e) => report.failures.push(BatchFailure {
                user_id: *invitee_id,
                error: e.to_string(),
            }),
        }
    }
    Ok(report)
}

pub async fn respond_invite(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    status: InviteStatus,
) -> Result<EventInvite, AppError> {
    if status == InviteStatus::Pending {
        return Err(AppError::ValidationError(
            "Response must be accepted or declined".to_string(),
        ));
    }

    // The invitee may not be able to see the event yet (private, invite
    // still pending), so this path checks the invite itself rather than
    // visibility. No invite and no event look identical from outside.
    if store::events::find(pool, event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }
    let existing = store::engagement::find_invite(pool, event_id, caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if existing.status != InviteStatus::Pending {
        return Err(AppError::Conflict(
            "Invite has already been responded to".to_string(),
        ));
    }

    store::engagement::respond_invite(pool, event_id, caller.id, status)
        .await?
        .ok_or_else(|| AppError::Conflict("Invite has already been responded to".to_string()))
}
