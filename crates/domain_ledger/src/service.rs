//! Ledger use cases
//!
//! `LedgerService` is the façade the API layer talks to. It validates input,
//! delegates persistence to a [`LedgerStore`] and owns the settlement saga's
//! commit retry: only the atomic commit itself is retried, and only when the
//! store reports a transient failure.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use core_kernel::{AccountId, HealthCheckResult, Money, SettlementId};
use crate::account::Account;
use crate::entry::{LedgerEntry, NewEntry, DIRECT_ENTRY_LABEL};
use crate::error::{ErrorKind, LedgerError};
use crate::ledger::BalanceDiscrepancy;
use crate::ports::LedgerStore;
use crate::reconstruction::{self, BillView, JoinedEntry};
use crate::settlement::{SettlementReceipt, SettlementRequest};

/// How often and how patiently a settlement commit is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPolicy {
    /// Total attempts, the first one included
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly after that
    pub backoff: Duration,
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Application service over a ledger store
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    policy: CommitPolicy,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_policy(store, CommitPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn LedgerStore>, policy: CommitPolicy) -> Self {
        Self {
            store,
            policy: CommitPolicy {
                attempts: policy.attempts.max(1),
                ..policy
            },
        }
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn open_account(&self, name: &str) -> Result<Account, LedgerError> {
        let account = self.store.open_account(name).await?;
        info!(account_id = %account.id, "Account opened");
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store.get_account(id).await
    }

    pub async fn list_active(&self) -> Result<Vec<Account>, LedgerError> {
        self.store.list_active().await
    }

    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn rename_account(&self, id: AccountId, name: &str) -> Result<Account, LedgerError> {
        self.store.rename_account(id, name).await
    }

    /// Soft-deletes an account; deleting twice is not an error
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn soft_delete(&self, id: AccountId) -> Result<bool, LedgerError> {
        let changed = self.store.soft_delete(id).await?;
        if changed {
            info!("Account soft-deleted");
        }
        Ok(changed)
    }

    // ========================================================================
    // Direct entries
    // ========================================================================

    /// Deposits a positive amount
    ///
    /// `label` defaults to [`DIRECT_ENTRY_LABEL`]. The sentinel itself is
    /// refused as an explicit label, so it only ever marks unlabelled
    /// deposits and withdrawals.
    #[instrument(skip(self), fields(account_id = %id, amount = %amount))]
    pub async fn credit(
        &self,
        id: AccountId,
        amount: Money,
        date: NaiveDate,
        label: Option<String>,
    ) -> Result<Account, LedgerError> {
        require_positive(amount, "credit")?;
        let label = match label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) {
            Some(l) if l == DIRECT_ENTRY_LABEL => {
                return Err(LedgerError::validation(format!(
                    "'{}' is reserved for unlabelled entries",
                    DIRECT_ENTRY_LABEL
                )))
            }
            Some(l) => l,
            None => DIRECT_ENTRY_LABEL.to_string(),
        };

        self.post(NewEntry::credit(id, date, amount, label)).await
    }

    /// Withdraws a positive amount, stored as a negative direct entry
    #[instrument(skip(self), fields(account_id = %id, amount = %amount))]
    pub async fn debit(&self, id: AccountId, amount: Money, date: NaiveDate) -> Result<Account, LedgerError> {
        require_positive(amount, "debit")?;
        self.post(NewEntry::debit(id, date, amount, DIRECT_ENTRY_LABEL)).await
    }

    async fn post(&self, entry: NewEntry) -> Result<Account, LedgerError> {
        let applied = self.store.apply_entry(entry).await?;
        info!(entry_id = %applied.entry_id, balance = %applied.balance, "Entry applied");

        let mut account = self.store.get_account(applied.account_id).await?;
        account.balance = applied.balance;
        Ok(account)
    }

    pub async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.store.entries_for(id).await
    }

    pub async fn all_entries(&self) -> Result<Vec<JoinedEntry>, LedgerError> {
        self.store.all_entries().await
    }

    // ========================================================================
    // Settlement
    // ========================================================================

    /// Settles a bill: one payer credit and one debit per positive share,
    /// committed as a unit
    ///
    /// Validation failures return before the store is touched. A transient
    /// commit failure is retried with the same prepared settlement, so every
    /// attempt carries the same settlement id and idempotency key.
    #[instrument(
        skip(self, request),
        fields(payer_id = %request.payer_id, shop = %request.shop, key = %request.idempotency_key)
    )]
    pub async fn settle_bill(&self, request: SettlementRequest) -> Result<SettlementReceipt, LedgerError> {
        let prepared = request.prepare().map_err(|e| {
            warn!(error = %e, "Settlement rejected");
            e
        })?;

        let mut attempt = 1;
        loop {
            match self.store.commit_settlement(prepared.clone()).await {
                Ok(receipt) => {
                    if receipt.replayed {
                        info!(settlement_id = %receipt.settlement_id, "Settlement replayed");
                    } else {
                        info!(
                            settlement_id = %receipt.settlement_id,
                            entries = receipt.entry_ids.len(),
                            "Settlement committed"
                        );
                    }
                    return Ok(receipt);
                }
                Err(e) if e.is_transient() && attempt < self.policy.attempts => {
                    warn!(attempt, error = %e, "Settlement commit failed, retrying");
                    tokio::time::sleep(self.policy.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.kind() == ErrorKind::Storage {
                        error!(attempt, error = %e, "Settlement commit failed");
                    }
                    return Err(e);
                }
            }
        }
    }

    // ========================================================================
    // Reconstruction
    // ========================================================================

    /// Infers the bill recorded under (shop, date)
    #[instrument(skip(self))]
    pub async fn reconstruct_bill(&self, shop: &str, date: NaiveDate) -> Result<BillView, LedgerError> {
        let rows = self.store.entries_for_bill(shop, date).await?;
        reconstruction::reconstruct_bill(shop, date, &rows)
    }

    /// Looks a bill up by the settlement that wrote it
    #[instrument(skip(self), fields(settlement_id = %settlement_id))]
    pub async fn reconstruct_settlement(&self, settlement_id: SettlementId) -> Result<BillView, LedgerError> {
        let rows = self.store.entries_for_settlement(settlement_id).await?;
        reconstruction::reconstruct_settlement(settlement_id, &rows)
    }

    pub async fn reconcile(&self) -> Result<Vec<BalanceDiscrepancy>, LedgerError> {
        let discrepancies = self.store.reconcile().await?;
        for d in &discrepancies {
            error!(account_id = %d.account_id, recorded = %d.recorded, computed = %d.computed, "Balance drift");
        }
        Ok(discrepancies)
    }

    pub async fn health(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}

fn require_positive(amount: Money, what: &str) -> Result<(), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::validation(format!(
            "{} amount must be positive, got {}",
            what, amount
        )));
    }
    if !amount.is_within_ledger_range() {
        return Err(LedgerError::validation(format!(
            "{} amount must not exceed {}, got {}",
            what,
            Money::ledger_max(),
            amount
        )));
    }
    Ok(())
}
