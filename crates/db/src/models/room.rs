//! Room model.

use huddle_core::types::Timestamp;
use sqlx::FromRow;
use uuid::Uuid;

/// A room row from the `rooms` table.
#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub max_participants: i64,
    pub created_at: Timestamp,
}
