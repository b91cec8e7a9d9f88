//! Domain Adapters
//!
//! Implementations of domain ports backed by PostgreSQL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerStore;
//! use domain_ledger::LedgerStore;
//!
//! let store = PostgresLedgerStore::new(pool);
//! let accounts = store.list_active().await?;
//! ```

pub mod ledger;

pub use ledger::PostgresLedgerStore;
