//! Periodic deletion of expired refresh sessions.
//!
//! Refresh rows normally die on rotation or logout; the sweep reclaims the
//! ones whose owners simply walked away.

use std::time::Duration;

use chrono::Utc;
use huddle_db::repositories::SessionRepo;
use huddle_db::DbPool;

/// Spawn the sweep task. Runs until aborted (during shutdown).
pub fn start_session_sweep(pool: DbPool, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match SessionRepo::delete_expired(&pool, Utc::now()).await {
                Ok(0) => {}
                Ok(deleted) => {
                    tracing::info!(deleted, "expired refresh sessions swept");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "session sweep failed");
                }
            }
        }
    })
}
