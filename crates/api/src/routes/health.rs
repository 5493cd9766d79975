//! Liveness and readiness probes, mounted at root level.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use huddle_core::error::CoreError;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Readiness response payload.
#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /healthz -- process liveness. Always 200 while the server runs.
async fn healthz() -> &'static str {
    "ok"
}

/// GET /readyz -- readiness: verifies the database is reachable.
async fn readyz(State(state): State<AppState>) -> AppResult<Json<ReadyResponse>> {
    huddle_db::health_check(&state.pool)
        .await
        .map_err(|err| CoreError::Unavailable(format!("database unreachable: {err}")))?;

    Ok(Json(ReadyResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Mount health probes (intended for root level, outside the API tree).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
