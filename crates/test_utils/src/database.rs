//! PostgreSQL test harness
//!
//! Starts a throwaway PostgreSQL container per test with the ledger schema
//! applied. Requires a Docker daemon, so suites using it mark their tests
//! `#[ignore]`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const IMAGE: &str = "postgres";
const TAG: &str = "16-alpine";
const USER: &str = "kitty";
const PASSWORD: &str = "kitty";
const DATABASE: &str = "kitty_test";

const SCHEMA: &str = include_str!("../../infra_db/migrations/20240101000000_ledger.sql");

pub type HarnessError = Box<dyn std::error::Error + Send + Sync>;

/// Row counts of the three ledger tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub accounts: i64,
    pub entries: i64,
    pub settlement_keys: i64,
}

/// A running PostgreSQL container and a pool connected to it
///
/// The container stops when this value is dropped.
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pool: PgPool,
}

impl TestDatabase {
    pub async fn start() -> Result<Self, HarnessError> {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", USER)
            .with_env_var("POSTGRES_PASSWORD", PASSWORD)
            .with_env_var("POSTGRES_DB", DATABASE)
            .start()
            .await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let url = format!("postgres://{}:{}@{}:{}/{}", USER, PASSWORD, host, port, DATABASE);

        // Postgres logs the ready message once before its init restart; the acquire timeout covers the gap
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn counts(&self) -> Result<TableCounts, HarnessError> {
        let (accounts, entries, settlement_keys): (i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM accounts), \
                    (SELECT COUNT(*) FROM entries), \
                    (SELECT COUNT(*) FROM settlement_keys)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TableCounts {
            accounts,
            entries,
            settlement_keys,
        })
    }
}

/// Starts a fresh database for one test
pub async fn create_isolated_test_database() -> Result<TestDatabase, HarnessError> {
    TestDatabase::start().await
}
