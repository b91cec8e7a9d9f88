//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the kitty ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: [`repositories`] holds the SQL
//! and row types, [`adapters`] implements the domain's `LedgerStore` port on
//! top of them and translates rows into domain types.
//!
//! # Schema
//!
//! Three tables, created by the embedded migrations:
//! - `accounts`: one running balance per participant, soft-deleted via a flag
//! - `entries`: append-only signed lines, tagged with their settlement id
//! - `settlement_keys`: idempotency keys of committed settlements
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/kitty")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::LedgerRepository;
pub use adapters::PostgresLedgerStore;
