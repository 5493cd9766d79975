//! Domain error taxonomy.
//!
//! The engine returns these kinds; boundary adapters map them to protocol
//! status codes. Nothing in here carries sensitive values -- messages are
//! safe to serialize into error envelopes.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("invalid cursor")]
    InvalidCursor,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("room is full")]
    RoomFull,

    #[error("user already joined the room")]
    AlreadyJoined,

    #[error("user not in the room")]
    NotInRoom,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication failure kinds, all surfaced as 401 at the HTTP boundary.
///
/// The distinction matters for logs and for clients deciding whether to
/// re-login (`InvalidCredentials`, `SessionExpired`) or silently refresh
/// (`TokenExpired`).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired or not valid yet")]
    TokenExpired,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session expired")]
    SessionExpired,
}
