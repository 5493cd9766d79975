//! Participant models.

use huddle_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A membership row from the `room_participants` table.
#[derive(Debug, Clone, FromRow)]
pub struct Participant {
    pub room_id: Uuid,
    pub user_id: DbId,
    pub joined_at: Timestamp,
    pub last_seen: Timestamp,
}

/// A participant joined with the owning user's public profile fields.
/// Produced by the detailed roster query.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantProfile {
    pub user_id: DbId,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub joined_at: Timestamp,
    pub last_seen: Timestamp,
}
