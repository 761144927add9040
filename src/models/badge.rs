use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum BadgeType {
    Attendance,
    Speaker,
    Organizer,
    Volunteer,
}

impl BadgeType {
    pub fn label(&self) -> &'static str {
        match self {
            BadgeType::Attendance => "Attendance Badge",
            BadgeType::Speaker => "Speaker Badge",
            BadgeType::Organizer => "Organizer Badge",
            BadgeType::Volunteer => "Volunteer Badge",
        }
    }

    /// Numeric code used by the minting contract.
    pub fn code(&self) -> u8 {
        match self {
            BadgeType::Attendance => 0,
            BadgeType::Speaker => 1,
            BadgeType::Organizer => 2,
            BadgeType::Volunteer => 3,
        }
    }
}

/// Durable record of an issued reward. A row with a non-null event_id is
/// the canonical "already claimed" signal for that event; uniqueness of
/// (user_id, event_id) is enforced by a partial index in the schema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub badge_type: BadgeType,
    pub nft_minted: bool,
    pub tx_hash: Option<String>,
    pub token_id: Option<i64>,
    pub awarded_at: DateTime<Utc>,
}

/// Off-chain published token description; one row per mint operation,
/// shared across every recipient of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NftMetadata {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
