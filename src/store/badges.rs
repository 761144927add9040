use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Badge, BadgeType};

pub async fn find_for_event(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<Option<Badge>, sqlx::Error> {
    sqlx::query_as::<_, Badge>("SELECT * FROM badges WHERE user_id = $1 AND event_id = $2")
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

/// Reserves the claim before any chain interaction. The partial unique
/// index on (user_id, event_id) is the authoritative claim guard; the
/// loser of a concurrent claim fails right here, before minting.
pub async fn insert_reservation(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
    badge_type: BadgeType,
) -> Result<Badge, sqlx::Error> {
    sqlx::query_as::<_, Badge>(
        r#"
        INSERT INTO badges (user_id, event_id, badge_type, nft_minted)
        VALUES ($1, $2, $3, FALSE)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .bind(badge_type)
    .fetch_one(pool)
    .await
}

pub async fn mark_minted(
    pool: &PgPool,
    badge_id: Uuid,
    tx_hash: &str,
    token_id: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE badges SET nft_minted = TRUE, tx_hash = $2, token_id = $3 WHERE id = $1")
        .bind(badge_id)
        .bind(tx_hash)
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Releases a reservation whose mint never happened, so the user may try
/// again. Minted badge rows are never deleted.
pub async fn release_reservation(pool: &PgPool, badge_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM badges WHERE id = $1 AND nft_minted = FALSE")
        .bind(badge_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Appends the badge row for a successful batch mint. A user who already
/// holds a badge for the event keeps the original row untouched.
pub async fn insert_minted_if_absent(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
    badge_type: BadgeType,
    tx_hash: &str,
    token_id: Option<i64>,
) -> Result<Option<Badge>, sqlx::Error> {
    sqlx::query_as::<_, Badge>(
        r#"
        INSERT INTO badges (user_id, event_id, badge_type, nft_minted, tx_hash, token_id)
        VALUES ($1, $2, $3, TRUE, $4, $5)
        ON CONFLICT (user_id, event_id) WHERE event_id IS NOT NULL DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .bind(badge_type)
    .bind(tx_hash)
    .bind(token_id)
    .fetch_optional(pool)
    .await
}
