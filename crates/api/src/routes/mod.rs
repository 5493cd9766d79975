pub mod auth;
pub mod health;
pub mod rooms;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the API route tree (everything except the root-level health
/// probes).
///
/// ```text
/// /ws/rooms/{id}            WebSocket upgrade (query-string credentials)
///
/// /auth/register            register (public)
/// /auth/login               login (public)
/// /auth/refresh             refresh (public)
/// /auth/me                  profile (forwarded id or bearer)
/// /auth/logout              logout (requires auth)
/// /auth/password            change password (requires auth)
///
/// /rooms                    create, list
/// /rooms/{id}               get, delete
/// /rooms/{id}/join          join
/// /rooms/{id}/leave         leave
/// /rooms/{id}/participants  online roster
/// /rooms/{id}/chat          history
/// ```
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/ws/rooms/{id}", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/rooms", rooms::router(state))
}
