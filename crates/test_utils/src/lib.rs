//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! kitty ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built dates, amounts and names
//! - `builders`: Builder for settlement requests
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for ledger invariants
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
