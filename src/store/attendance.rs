use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::EventAttendance;

pub async fn find(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventAttendance>, sqlx::Error> {
    sqlx::query_as::<_, EventAttendance>(
        "SELECT * FROM event_attendance WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Inserts the single attendance row for (event, user). The unique pair
/// constraint is what closes the concurrent check-in race; callers map the
/// violation to a conflict rather than pre-checking alone.
pub async fn insert(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    latitude: f64,
    longitude: f64,
    distance_m: f64,
) -> Result<EventAttendance, sqlx::Error> {
    sqlx::query_as::<_, EventAttendance>(
        r#"
        INSERT INTO event_attendance (event_id, user_id, latitude, longitude, distance_m)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(latitude)
    .bind(longitude)
    .bind(distance_m)
    .fetch_one(pool)
    .await
}

/// Bulk toggle of the manager-controlled minting gate, keyed by attendee
/// user ids. Returns the number of attendance rows actually updated.
pub async fn set_minting_approval(
    pool: &PgPool,
    event_id: Uuid,
    attendee_ids: &[Uuid],
    approved: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE event_attendance SET approved_for_minting = $3 WHERE event_id = $1 AND user_id = ANY($2)",
    )
    .bind(event_id)
    .bind(attendee_ids)
    .bind(approved)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_for_event(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<EventAttendance>, sqlx::Error> {
    sqlx::query_as::<_, EventAttendance>(
        "SELECT * FROM event_attendance WHERE event_id = $1 ORDER BY checked_in_at",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

/// Attendance row joined with the attendee's wallet, for recipient
/// resolution in batch minting.
#[derive(Debug, Clone, FromRow)]
pub struct AttendeeWallet {
    pub attendance_id: Uuid,
    pub user_id: Uuid,
    pub wallet_address: Option<String>,
    pub nft_minted: bool,
}

pub async fn wallets_for_event(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<AttendeeWallet>, sqlx::Error> {
    sqlx::query_as::<_, AttendeeWallet>(
        r#"
        SELECT a.id AS attendance_id, a.user_id, u.wallet_address, a.nft_minted
        FROM event_attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.event_id = $1
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

pub async fn mark_minted(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    tx_hash: &str,
    token_id: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE event_attendance
        SET nft_minted = TRUE, tx_hash = $3, token_id = $4
        WHERE event_id = $1 AND user_id = $2
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(tx_hash)
    .bind(token_id)
    .execute(pool)
    .await?;
    Ok(())
}
