//! User model and DTOs.

use huddle_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A user row from the `users` table.
///
/// Deliberately not `Serialize`: `password_hash` must never reach a wire
/// boundary. Handlers map this into their own response DTOs.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub email_verified: bool,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user. Email is expected pre-normalized
/// (lowercased, trimmed) and the hash pre-computed.
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}
