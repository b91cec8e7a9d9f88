//! API configuration
//!
//! Every field can be set from a `KITTY_`-prefixed environment variable,
//! e.g. `KITTY_PORT=9000` or `KITTY_DATABASE_URL=postgres://...`. Fields that
//! are not set keep their [`Default`] value.

use serde::Deserialize;
use std::time::Duration;

use domain_ledger::CommitPolicy;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL URL; without one the server keeps the ledger in memory
    pub database_url: Option<String>,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Shared secret required to soft-delete an account; deletes are refused when unset
    pub delete_password: Option<String>,
    /// How long a settlement idempotency key is remembered
    pub idempotency_ttl_secs: u64,
    /// Settlement commit attempts, the first one included
    pub commit_attempts: u32,
    /// Base delay between settlement commit attempts
    pub retry_backoff_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            log_level: "info".to_string(),
            log_json: false,
            delete_password: None,
            idempotency_ttl_secs: 86_400,
            commit_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("KITTY").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idempotency_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.idempotency_ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        CommitPolicy {
            attempts: self.commit_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}
