use std::net::SocketAddr;
use std::sync::Arc;

use hermes_db::memory::{MemoryMessageLog, MemorySubscriberDirectory};
use hermes_db::{MessageLog, PgMessageLog, PgSubscriberDirectory, SubscriberDirectory};
use hermes_delivery::DispatcherRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hermes_api::config::{ServerConfig, StoreBackend};
use hermes_api::router::build_app_router;
use hermes_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hermes_api=debug,hermes_delivery=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        root_path = %config.root_path,
        strategy = %config.gateway.resolution_strategy,
        "Loaded server configuration"
    );

    // --- Stores ---
    let (directory, log): (Arc<dyn SubscriberDirectory>, Arc<dyn MessageLog>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .expect("DATABASE_URL must be set for the postgres store");

                let pool = hermes_db::create_pool(database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                hermes_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");
                tracing::info!("Database health check passed");

                hermes_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                let directory: Arc<dyn SubscriberDirectory> =
                    Arc::new(PgSubscriberDirectory::new(pool.clone()));
                let log: Arc<dyn MessageLog> =
                    Arc::new(PgMessageLog::new(pool, config.gateway.max_log_message_bytes));
                (directory, log)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store, data will not survive a restart");
                let directory: Arc<dyn SubscriberDirectory> =
                    Arc::new(MemorySubscriberDirectory::new());
                let log: Arc<dyn MessageLog> =
                    Arc::new(MemoryMessageLog::new(config.gateway.max_log_message_bytes));
                (directory, log)
            }
        };

    // --- Dispatchers ---
    let dispatchers = DispatcherRegistry::from_env().expect("Failed to build dispatchers");

    // --- App state ---
    let state = AppState::new(config.clone(), directory, log, dispatchers);

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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
