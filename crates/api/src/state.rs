use std::sync::Arc;

use crate::auth::jwt::TokenSigner;
use crate::config::ServerConfig;
use crate::ws::RoomHub;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: huddle_db::DbPool,
    /// Server configuration, immutable after startup.
    pub config: Arc<ServerConfig>,
    /// Access-token signer/validator (RSA keys parsed once at startup).
    pub signer: Arc<TokenSigner>,
    /// Per-room registry of live WebSocket sessions.
    pub hub: Arc<RoomHub>,
}
