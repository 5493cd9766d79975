//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use huddle_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from `Authorization: Bearer <access>` plus
/// the `X-User-ID` header.
///
/// The bearer is validated against the configured public key and its `sub`
/// must equal the supplied user id, so a caller cannot act as someone else
/// by editing the header. Use as an extractor parameter in any handler that
/// requires authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("invalid Authorization format, expected: Bearer <token>".into())
        })?;

        let header_id: DbId = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing X-User-ID".into()))?
            .trim()
            .parse()
            .map_err(|_| AppError::Unauthorized("invalid X-User-ID (must be int64)".into()))?;

        let subject = state.signer.user_id_from_token(token.trim())?;
        if header_id <= 0 || header_id != subject {
            return Err(AppError::Unauthorized(
                "X-User-ID does not match token subject".into(),
            ));
        }

        Ok(AuthUser { user_id: subject })
    }
}
