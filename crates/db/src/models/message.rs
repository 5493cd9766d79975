//! Chat message model.

use huddle_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A chat message row from the `room_messages` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: DbId,
    pub text: String,
    pub reply_to: Option<Uuid>,
    pub created_at: Timestamp,
}
