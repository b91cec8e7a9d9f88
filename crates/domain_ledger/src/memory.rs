//! In-memory ledger store
//!
//! A single `RwLock` guards the ledger and the idempotency records together,
//! so a settlement commit is serialized against every other write and is
//! never observed half-applied.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use core_kernel::{AccountId, DomainPort, HealthCheckResult, HealthCheckable, SettlementId};
use crate::account::Account;
use crate::entry::{AppliedEntry, LedgerEntry, NewEntry};
use crate::error::LedgerError;
use crate::idempotency::{IdempotencyStore, KeyRecord};
use crate::ledger::{BalanceDiscrepancy, Ledger};
use crate::ports::LedgerStore;
use crate::reconstruction::JoinedEntry;
use crate::settlement::{PreparedSettlement, SettlementReceipt};

#[derive(Debug, Default)]
struct MemoryState {
    ledger: Ledger,
    keys: IdempotencyStore,
}

/// Process-local implementation of [`LedgerStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose idempotency keys expire after `ttl`
    pub fn with_key_ttl(ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                ledger: Ledger::new(),
                keys: IdempotencyStore::new(ttl),
            })),
        }
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-ledger-store", 0)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn open_account(&self, name: &str) -> Result<Account, LedgerError> {
        self.state.write().await.ledger.open_account(name)
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.state.read().await.ledger.account(id).cloned()
    }

    async fn list_active(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.state.read().await.ledger.list_active().cloned().collect())
    }

    async fn rename_account(&self, id: AccountId, name: &str) -> Result<Account, LedgerError> {
        self.state.write().await.ledger.rename_account(id, name)
    }

    async fn soft_delete(&self, id: AccountId) -> Result<bool, LedgerError> {
        self.state.write().await.ledger.soft_delete(id)
    }

    async fn apply_entry(&self, entry: NewEntry) -> Result<AppliedEntry, LedgerError> {
        self.state.write().await.ledger.apply_entry(entry)
    }

    async fn commit_settlement(&self, settlement: PreparedSettlement) -> Result<SettlementReceipt, LedgerError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(receipt) = state
            .keys
            .check(&settlement.idempotency_key, &settlement.fingerprint, now)?
        {
            debug!(key = %settlement.idempotency_key, "Replaying committed settlement");
            return Ok(receipt);
        }

        for id in &settlement.participants {
            state.ledger.active_account(*id)?;
        }

        let applied = state.ledger.apply_batch(settlement.entries)?;
        let entry_ids: Vec<_> = applied.iter().map(|a| a.entry_id).collect();

        state.keys.record(
            settlement.idempotency_key,
            KeyRecord {
                settlement_id: settlement.settlement_id,
                fingerprint: settlement.fingerprint,
                entry_ids: entry_ids.clone(),
                recorded_at: now,
            },
        );

        Ok(SettlementReceipt {
            settlement_id: settlement.settlement_id,
            entry_ids,
            replayed: false,
        })
    }

    async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.read().await;
        state.ledger.account(id)?;
        Ok(state.ledger.entries_for(id).cloned().collect())
    }

    async fn all_entries(&self) -> Result<Vec<JoinedEntry>, LedgerError> {
        Ok(self
            .state
            .read()
            .await
            .ledger
            .all_entries()
            .map(|(entry, name)| JoinedEntry {
                entry: entry.clone(),
                account_name: name.to_string(),
            })
            .collect())
    }

    async fn entries_for_bill(&self, shop: &str, date: NaiveDate) -> Result<Vec<JoinedEntry>, LedgerError> {
        Ok(self.state.read().await.ledger.entries_for_bill(shop, date))
    }

    async fn entries_for_settlement(&self, settlement_id: SettlementId) -> Result<Vec<JoinedEntry>, LedgerError> {
        Ok(self.state.read().await.ledger.entries_for_settlement(settlement_id))
    }

    async fn reconcile(&self) -> Result<Vec<BalanceDiscrepancy>, LedgerError> {
        Ok(self.state.read().await.ledger.reconcile())
    }
}
