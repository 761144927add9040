use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Proof of physical presence. Created exactly once per (event, user) by a
/// successful check-in; the mint orchestrator later fills in the nft fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventAttendance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_m: f64,
    pub checked_in_at: DateTime<Utc>,
    pub approved_for_minting: bool,
    pub nft_minted: bool,
    pub tx_hash: Option<String>,
    pub token_id: Option<i64>,
}
