//! Refresh-session model and DTOs.

use huddle_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A refresh session row from the `auth_sessions` table.
///
/// `token_hash` is the hex SHA-256 of the opaque refresh token; the
/// plaintext is never stored.
#[derive(Debug, Clone, FromRow)]
pub struct AuthSession {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl AuthSession {
    /// Whether the session is past its expiry at the given instant.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// DTO for creating a new refresh session.
pub struct CreateSession {
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}
