use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    EventGuest, EventInvite, EventJoinRequest, EventRsvp, InviteStatus, JoinRequestStatus,
    RsvpStatus,
};

// ---------------------------------------------------------------------------
// RSVP

pub async fn find_rsvp(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventRsvp>, sqlx::Error> {
    sqlx::query_as::<_, EventRsvp>(
        "SELECT * FROM event_rsvps WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Plain upsert, used for NOT_GOING and for uncapped events.
pub async fn upsert_rsvp(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    status: RsvpStatus,
) -> Result<EventRsvp, sqlx::Error> {
    sqlx::query_as::<_, EventRsvp>(
        r#"
        INSERT INTO event_rsvps (event_id, user_id, status)
        VALUES ($1, $2, $3)
        ON CONFLICT (event_id, user_id)
        DO UPDATE SET status = EXCLUDED.status, updated_at = now()
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

/// GOING upsert with the capacity condition evaluated inside the statement:
/// the count of other users' GOING rows must be below the cap. The caller's
/// own prior GOING row is excluded so a re-confirmation never trips the cap.
/// Returns `None` when the event is at capacity.
pub async fn upsert_rsvp_going_capped(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    max_attendees: i32,
) -> Result<Option<EventRsvp>, sqlx::Error> {
    sqlx::query_as::<_, EventRsvp>(
        r#"
        INSERT INTO event_rsvps (event_id, user_id, status)
        SELECT $1::uuid, $2::uuid, 'going'
        WHERE (SELECT COUNT(*) FROM event_rsvps
               WHERE event_id = $1 AND status = 'going' AND user_id <> $2) < $3::bigint
        ON CONFLICT (event_id, user_id)
        DO UPDATE SET status = 'going', updated_at = now()
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(max_attendees as i64)
    .fetch_optional(pool)
    .await
}

pub async fn list_going_with_wallets(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<(Uuid, Option<String>)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, Option<String>)>(
        r#"
        SELECT r.user_id, u.wallet_address
        FROM event_rsvps r
        JOIN users u ON u.id = r.user_id
        WHERE r.event_id = $1 AND r.status = 'going'
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

// ---------------------------------------------------------------------------
// Join requests

pub async fn find_join_request(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventJoinRequest>, sqlx::Error> {
    sqlx::query_as::<_, EventJoinRequest>(
        "SELECT * FROM event_join_requests WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Creates a join request, or resets a previously rejected one back to
/// pending (resubmission clears `responded_at`). An existing pending or
/// approved request produces no row, which the caller reports as a
/// conflict.
pub async fn create_or_resubmit_join_request(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    message: Option<&str>,
) -> Result<Option<EventJoinRequest>, sqlx::Error> {
    sqlx::query_as::<_, EventJoinRequest>(
        r#"
        INSERT INTO event_join_requests (event_id, user_id, message)
        VALUES ($1, $2, $3)
        ON CONFLICT (event_id, user_id) DO UPDATE
        SET status = 'pending',
            message = EXCLUDED.message,
            responded_at = NULL,
            updated_at = now()
        WHERE event_join_requests.status = 'rejected'
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(message)
    .fetch_optional(pool)
    .await
}

/// Responds to a pending join request. When approving a capped event the
/// capacity condition is evaluated inside the statement against the count
/// of already-approved requests; zero rows back means the request was not
/// pending anymore or the event is full.
pub async fn respond_join_request(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    status: JoinRequestStatus,
    max_attendees: Option<i32>,
) -> Result<Option<EventJoinRequest>, sqlx::Error> {
    sqlx::query_as::<_, EventJoinRequest>(
        r#"
        UPDATE event_join_requests SET
            status = $3,
            responded_at = now(),
            updated_at = now()
        WHERE event_id = $1 AND user_id = $2 AND status = 'pending'
          AND ($4::int IS NULL
               OR $3 <> 'approved'
               OR (SELECT COUNT(*) FROM event_join_requests
                   WHERE event_id = $1 AND status = 'approved') < $4)
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(status)
    .bind(max_attendees)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Invites

pub async fn find_invite(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventInvite>, sqlx::Error> {
    sqlx::query_as::<_, EventInvite>(
        "SELECT * FROM event_invites WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Returns `None` when an invite for this user already exists.
pub async fn create_invite(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventInvite>, sqlx::Error> {
    sqlx::query_as::<_, EventInvite>(
        r#"
        INSERT INTO event_invites (event_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (event_id, user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// The invitee responds exactly once; a non-pending invite yields no row.
pub async fn respond_invite(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    status: InviteStatus,
) -> Result<Option<EventInvite>, sqlx::Error> {
    sqlx::query_as::<_, EventInvite>(
        r#"
        UPDATE event_invites SET status = $3, updated_at = now()
        WHERE event_id = $1 AND user_id = $2 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(status)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Guests

pub async fn find_guest_for_user(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventGuest>, sqlx::Error> {
    sqlx::query_as::<_, EventGuest>(
        "SELECT * FROM event_guests WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
