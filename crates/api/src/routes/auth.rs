//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::middleware::logging;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// Request bodies on this subtree carry credentials, so they are logged
/// only through the redaction layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route("/password", post(auth::change_password))
        .layer(axum::middleware::from_fn(logging::log_request_body))
}
