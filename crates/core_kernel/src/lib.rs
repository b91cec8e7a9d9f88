//! Core Kernel - Foundational types for the kitty ledger
//!
//! This crate provides the building blocks used by the ledger domain and its
//! adapters:
//! - Money with exact three-digit fixed-point arithmetic
//! - Percentage rates for surcharges
//! - Typed identifiers for accounts, entries and settlements
//! - Port marker and health-check traits

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, MoneyError, Rate};
pub use identifiers::{AccountId, EntryId, SettlementId};
pub use ports::{DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable};
