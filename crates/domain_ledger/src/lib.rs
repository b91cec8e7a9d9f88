//! Ledger Domain - Shared balances and bill settlement
//!
//! This crate holds the settlement engine of the kitty ledger: named accounts
//! with running balances, an append-only entry log, proportional tax
//! distribution, atomic bill settlement and bill reconstruction.
//!
//! # Ledger Principles
//!
//! - An account's balance always equals the sum of its entries
//! - Entries are immutable and only ever appended
//! - Accounts are soft-deleted, never removed, so history keeps its owners
//! - A settlement writes its payer credit and every contributor debit
//!   together or not at all
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{InMemoryLedgerStore, LedgerService, SettlementRequest};
//!
//! let service = LedgerService::new(Arc::new(InMemoryLedgerStore::new()));
//! let ali = service.open_account("Ali").await?;
//! let sara = service.open_account("Sara").await?;
//!
//! service.settle_bill(SettlementRequest {
//!     payer_id: ali.id,
//!     total: Money::new(dec!(10)),
//!     date,
//!     shop: "Cafe".into(),
//!     contributions: vec![
//!         Contribution { account_id: ali.id, share: Money::new(dec!(6)) },
//!         Contribution { account_id: sara.id, share: Money::new(dec!(4)) },
//!     ],
//!     idempotency_key: IdempotencyKey::parse("client-token")?,
//! }).await?;
//!
//! let bill = service.reconstruct_bill("Cafe", date).await?;
//! ```

pub mod account;
pub mod entry;
pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod memory;
pub mod ports;
pub mod reconstruction;
pub mod service;
pub mod settlement;
pub mod tax;

pub use account::{Account, DELETED_ACCOUNT_NAME};
pub use entry::{AppliedEntry, LedgerEntry, NewEntry, DIRECT_ENTRY_LABEL};
pub use error::{ErrorKind, LedgerError};
pub use idempotency::{IdempotencyStore, KeyRecord};
pub use ledger::{BalanceDiscrepancy, Ledger};
pub use memory::InMemoryLedgerStore;
pub use ports::LedgerStore;
pub use reconstruction::{BillView, JoinedEntry, Participant};
pub use service::{CommitPolicy, LedgerService};
pub use settlement::{
    settlement_tolerance, Contribution, IdempotencyKey, PreparedSettlement, SettlementReceipt, SettlementRequest,
};
pub use tax::{apply_tax, BillDraft};
