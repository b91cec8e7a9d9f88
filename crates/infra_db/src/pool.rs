//! Connection pool and schema migrations
//!
//! Every connection is opened with a `lock_timeout` so that a settlement
//! waiting on another settlement's row locks fails over to the retry path
//! instead of blocking indefinitely.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

const APPLICATION_NAME: &str = "kitty-ledger";

/// Pool settings
///
/// ```rust,ignore
/// let pool = create_pool(
///     DatabaseConfig::new("postgres://localhost/kitty")
///         .max_connections(20)
///         .lock_timeout(Duration::from_secs(1)),
/// )
/// .await?;
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free connection; expiry is a transient error
    pub acquire_timeout: Duration,
    /// Longest wait for a row lock inside one statement
    pub lock_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(600),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Connection options derived from the URL plus the session settings
    pub fn connect_options(&self) -> Result<PgConnectOptions, DatabaseError> {
        let lock_timeout = format!("{}ms", self.lock_timeout.as_millis());
        Ok(PgConnectOptions::from_str(&self.url)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?
            .application_name(APPLICATION_NAME)
            .options([("lock_timeout", lock_timeout.as_str())]))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/kitty")
    }
}

/// Opens the pool
///
/// # Errors
///
/// `DatabaseError::ConnectionFailed` if the URL is malformed or the server
/// cannot be reached
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        lock_timeout_ms = config.lock_timeout.as_millis() as u64,
        "Creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect_with(config.connect_options()?)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("Database pool created");
    Ok(pool)
}

/// Applies the embedded ledger migrations; already applied ones are skipped
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.lock_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_builder_and_options() {
        let config = DatabaseConfig::new("postgres://kitty:secret@db:5433/ledger")
            .max_connections(50)
            .lock_timeout(Duration::from_millis(250));
        assert_eq!(config.max_connections, 50);

        let options = config.connect_options().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("ledger"));
        assert_eq!(options.get_application_name(), Some(APPLICATION_NAME));
    }

    #[test]
    fn test_malformed_url() {
        let config = DatabaseConfig::new("not a url");
        assert!(matches!(config.connect_options(), Err(DatabaseError::ConnectionFailed(_))));
    }
}
