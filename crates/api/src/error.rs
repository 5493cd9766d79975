use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use huddle_core::error::{AuthError, CoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the `{ "error": { code, message } }`
/// envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `huddle-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A boundary-level 401 (missing or malformed credentials headers).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Core(CoreError::Auth(err))
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a domain error kind to an HTTP status, error code, and message.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InvalidCursor => (
            StatusCode::BAD_REQUEST,
            "INVALID_CURSOR",
            err.to_string(),
        ),
        CoreError::Auth(auth) => (StatusCode::UNAUTHORIZED, auth_code(auth), auth.to_string()),
        CoreError::AlreadyExists { .. } => {
            (StatusCode::CONFLICT, "ALREADY_EXISTS", err.to_string())
        }
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        CoreError::RoomFull => (StatusCode::CONFLICT, "ROOM_FULL", err.to_string()),
        CoreError::AlreadyJoined => (StatusCode::CONFLICT, "ALREADY_JOINED", err.to_string()),
        CoreError::NotInRoom => (StatusCode::NOT_FOUND, "NOT_IN_ROOM", err.to_string()),
        CoreError::Unavailable(msg) => {
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg.clone())
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Error codes for the 401 family, so clients can distinguish "re-login"
/// from "refresh".
fn auth_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidToken => "INVALID_TOKEN",
        AuthError::TokenExpired => "TOKEN_EXPIRED",
        AuthError::InvalidIssuer => "INVALID_ISSUER",
        AuthError::InvalidAudience => "INVALID_AUDIENCE",
        AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
        AuthError::SessionExpired => "SESSION_EXPIRED",
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (Postgres code `23505`) map to 409, so a
///   duplicate-key race surfaces as `AlreadyExists` rather than a 500.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                return (
                    StatusCode::CONFLICT,
                    "ALREADY_EXISTS",
                    "Duplicate value violates a unique constraint".to_string(),
                );
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
