//! Repository implementations
//!
//! Repositories encapsulate SQL queries and map database rows to plain row
//! structs. They know nothing about domain rules; the adapters do.
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow`, so the
//! crate compiles without a live database.

pub mod ledger;

pub use ledger::LedgerRepository;
