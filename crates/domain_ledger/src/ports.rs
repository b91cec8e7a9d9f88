//! Ledger storage port
//!
//! The `LedgerStore` trait is everything the ledger use cases need from a
//! backing store. Two adapters implement it:
//!
//! - **In-memory**: [`crate::memory::InMemoryLedgerStore`], used by tests and
//!   by the server when no database is configured
//! - **PostgreSQL**: `infra_db::PostgresLedgerStore`
//!
//! # Usage
//!
//! ```rust,ignore
//! let store: Arc<dyn LedgerStore> = match config.database_url {
//!     Some(url) => Arc::new(PostgresLedgerStore::connect(&url).await?),
//!     None => Arc::new(InMemoryLedgerStore::new()),
//! };
//! let service = LedgerService::new(store);
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{AccountId, DomainPort, HealthCheckable, SettlementId};
use crate::account::Account;
use crate::entry::{AppliedEntry, LedgerEntry, NewEntry};
use crate::error::LedgerError;
use crate::ledger::BalanceDiscrepancy;
use crate::reconstruction::JoinedEntry;
use crate::settlement::{PreparedSettlement, SettlementReceipt};

/// Storage port for accounts and entries
///
/// Every write is atomic: it either fully happens or leaves the store
/// untouched. Entry listings are ordered newest first (date descending,
/// insertion order descending).
#[async_trait]
pub trait LedgerStore: DomainPort + HealthCheckable {
    // ========================================================================
    // Accounts
    // ========================================================================

    /// Creates an account with a zero balance
    async fn open_account(&self, name: &str) -> Result<Account, LedgerError>;

    /// Gets an account by ID, soft-deleted ones included
    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Lists accounts that are not soft-deleted
    async fn list_active(&self) -> Result<Vec<Account>, LedgerError>;

    /// Renames an active account
    async fn rename_account(&self, id: AccountId, name: &str) -> Result<Account, LedgerError>;

    /// Soft-deletes an account; `Ok(false)` if it was already deleted
    async fn soft_delete(&self, id: AccountId) -> Result<bool, LedgerError>;

    // ========================================================================
    // Entries
    // ========================================================================

    /// Appends one entry and updates the owning balance in the same unit
    async fn apply_entry(&self, entry: NewEntry) -> Result<AppliedEntry, LedgerError>;

    /// Commits a prepared settlement atomically
    ///
    /// The idempotency key is resolved inside the same unit of work: a key
    /// already recorded with the same fingerprint returns its original
    /// receipt with `replayed = true` and writes nothing.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if any participant is missing or soft-deleted
    /// - `IdempotencyConflict` if the key was used for a different payload
    /// - `Storage` with `transient = true` if the commit may be retried
    async fn commit_settlement(&self, settlement: PreparedSettlement) -> Result<SettlementReceipt, LedgerError>;

    /// Entries of one account, newest first
    ///
    /// Fails with `AccountNotFound` only for IDs that never existed; a
    /// soft-deleted account keeps its history.
    async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Every entry joined with its owner's current name, newest first
    async fn all_entries(&self) -> Result<Vec<JoinedEntry>, LedgerError>;

    /// Entries labelled `shop` on `date`
    async fn entries_for_bill(&self, shop: &str, date: NaiveDate) -> Result<Vec<JoinedEntry>, LedgerError>;

    /// Entries written by one settlement
    async fn entries_for_settlement(&self, settlement_id: SettlementId) -> Result<Vec<JoinedEntry>, LedgerError>;

    /// Recomputes every balance from its entries and reports mismatches
    async fn reconcile(&self) -> Result<Vec<BalanceDiscrepancy>, LedgerError>;
}
