//! Kitty Ledger - API Server Binary
//!
//! This binary starts the HTTP API server for the shared-expense ledger.
//!
//! # Usage
//!
//! ```bash
//! # Run with an in-memory ledger
//! cargo run --bin kitty-api
//!
//! # Run against PostgreSQL
//! KITTY_DATABASE_URL=postgres://localhost/kitty KITTY_DELETE_PASSWORD=secret cargo run --bin kitty-api
//! ```
//!
//! # Environment Variables
//!
//! * `KITTY_HOST` - Server host (default: 0.0.0.0)
//! * `KITTY_PORT` - Server port (default: 8080)
//! * `KITTY_DATABASE_URL` - PostgreSQL connection string; in-memory store when unset
//! * `KITTY_DELETE_PASSWORD` - Password required to delete accounts; deletes are refused when unset
//! * `KITTY_IDEMPOTENCY_TTL_SECS` - Settlement key lifetime (default: 86400)
//! * `KITTY_COMMIT_ATTEMPTS` - Settlement commit attempts (default: 3)
//! * `KITTY_RETRY_BACKOFF_MS` - Base delay between commit attempts (default: 50)
//! * `KITTY_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `KITTY_LOG_JSON` - Emit JSON log lines (default: false)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use domain_ledger::{InMemoryLedgerStore, LedgerService, LedgerStore};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
use interface_api::{config::ApiConfig, create_router};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, picks the ledger store and
/// starts the HTTP server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - Database connection or migration fails
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid KITTY_* configuration")?;

    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting Kitty Ledger API Server"
    );

    let store = build_store(&config).await?;
    let service = LedgerService::with_policy(store, config.commit_policy());

    let app = create_router(service, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Connects to PostgreSQL when a URL is configured, otherwise keeps the
/// ledger in memory.
async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn LedgerStore>> {
    let ttl = config.idempotency_ttl();

    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(DatabaseConfig::new(url.clone()))
                .await
                .context("database connection failed")?;

            tracing::info!("Running database migrations...");
            run_migrations(&pool).await.context("database migration failed")?;

            tracing::info!("Database ready");
            Ok(Arc::new(PostgresLedgerStore::new(pool).with_key_ttl(ttl)))
        }
        None => {
            tracing::warn!("KITTY_DATABASE_URL not set, ledger is kept in memory");
            Ok(Arc::new(InMemoryLedgerStore::with_key_ttl(ttl)))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
