use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huddle_api::auth::jwt::TokenSigner;
use huddle_api::background;
use huddle_api::config::ServerConfig;
use huddle_api::router::build_app_router;
use huddle_api::state::AppState;
use huddle_api::ws::RoomHub;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let signer = TokenSigner::from_config(&config.auth.jwt)
        .expect("Failed to parse RSA key material");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = huddle_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    huddle_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    huddle_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Hub and background tasks ---
    let hub = Arc::new(RoomHub::new());

    let sweep_handle = background::start_session_sweep(
        pool.clone(),
        config.auth.session_sweep_interval_secs,
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        signer: Arc::new(signer),
        hub: Arc::clone(&hub),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Shutdown flow: the signal stops the listener, live WebSocket sessions
    // get a Close frame so upgraded connections can drain, and in-flight
    // work gets a bounded grace before remaining connections are dropped.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let server = axum::serve(listener, app).with_graceful_shutdown({
        let mut rx = shutdown_rx.clone();
        async move {
            let _ = rx.changed().await;
        }
    });

    let drain = {
        let hub = Arc::clone(&hub);
        let grace = Duration::from_secs(config.shutdown_grace_secs);
        let mut rx = shutdown_rx;
        async move {
            let _ = rx.changed().await;
            let session_count = hub.session_count().await;
            tracing::info!(session_count, "Closing remaining WebSocket sessions");
            hub.shutdown_all().await;
            tokio::time::sleep(grace).await;
        }
    };

    tokio::select! {
        result = server => {
            result.expect("Server error");
            tracing::info!("All connections drained");
        }
        () = drain => {
            tracing::warn!("Grace period elapsed, forcing remaining connections closed");
        }
    }

    sweep_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
