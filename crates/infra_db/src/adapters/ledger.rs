//! PostgreSQL Ledger Adapter
//!
//! Implements the `LedgerStore` port on top of [`LedgerRepository`].
//!
//! # Transactions
//!
//! Every write runs in its own transaction. Account rows touched by a write
//! are locked with `SELECT ... FOR UPDATE` in key order before anything is
//! inserted, so two settlements over the same accounts serialize instead of
//! interleaving. Readers run at READ COMMITTED and therefore only ever see
//! whole settlements.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool));
//! ```

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{AccountId, DomainPort, EntryId, HealthCheckResult, HealthCheckable, Money, SettlementId};
use domain_ledger::account::validate_name;
use domain_ledger::idempotency::{default_key_ttl, KeyRecord};
use domain_ledger::{
    Account, AppliedEntry, BalanceDiscrepancy, JoinedEntry, LedgerEntry, LedgerError, LedgerStore, NewEntry,
    PreparedSettlement, SettlementReceipt, DELETED_ACCOUNT_NAME,
};

use crate::error::DatabaseError;
use crate::repositories::ledger::{AccountRow, EntryRow, KeyRow, LedgerRepository, NewEntryRow};

/// PostgreSQL-backed implementation of the LedgerStore trait
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    repository: LedgerRepository,
    key_ttl: Duration,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: LedgerRepository::new(pool),
            key_ttl: default_key_ttl(),
        }
    }

    /// Sets how long idempotency keys are remembered
    pub fn with_key_ttl(mut self, ttl: Duration) -> Self {
        self.key_ttl = ttl;
        self
    }

    pub fn repository(&self) -> &LedgerRepository {
        &self.repository
    }

    fn pool(&self) -> &PgPool {
        self.repository.pool()
    }

    async fn fetch_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.repository
            .fetch_account(id.into())
            .await?
            .map(row_to_account)
            .ok_or(LedgerError::AccountNotFound(id))
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(self.pool()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-ledger-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-ledger-store",
                latency_ms,
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self))]
    async fn open_account(&self, name: &str) -> Result<Account, LedgerError> {
        let account = Account::open(name)?;
        if self.repository.active_name_exists(&account.name).await? {
            warn!(name = %account.name, "Opening account with a name that is already in use");
        }

        let row = self
            .repository
            .insert_account(account.id.into(), &account.name, account.balance.amount())
            .await?;
        Ok(row_to_account(row))
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.fetch_account(id).await
    }

    async fn list_active(&self) -> Result<Vec<Account>, LedgerError> {
        let rows = self.repository.list_active().await?;
        Ok(rows.into_iter().map(row_to_account).collect())
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn rename_account(&self, id: AccountId, name: &str) -> Result<Account, LedgerError> {
        let name = validate_name(name)?;
        self.repository
            .rename_account(id.into(), &name)
            .await?
            .map(row_to_account)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn soft_delete(&self, id: AccountId) -> Result<bool, LedgerError> {
        if self.repository.mark_deleted(id.into(), DELETED_ACCOUNT_NAME).await? {
            return Ok(true);
        }
        // unknown ids are an error, already-deleted ones are not
        self.fetch_account(id).await.map(|_| false)
    }

    #[instrument(skip(self, entry), fields(account_id = %entry.account_id))]
    async fn apply_entry(&self, entry: NewEntry) -> Result<AppliedEntry, LedgerError> {
        let mut tx = self.pool().begin().await.map_err(DatabaseError::from)?;

        let locked = LedgerRepository::lock_accounts(&mut *tx, &[entry.account_id.into()]).await?;
        require_active(&locked, &[entry.account_id])?;

        let (entry_id, balance) = write_entry(&mut *tx, &entry).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        debug!(entry_id = %entry_id, "Entry committed");
        Ok(AppliedEntry {
            entry_id,
            account_id: entry.account_id,
            balance,
        })
    }

    #[instrument(skip(self, settlement), fields(settlement_id = %settlement.settlement_id))]
    async fn commit_settlement(&self, settlement: PreparedSettlement) -> Result<SettlementReceipt, LedgerError> {
        let key = settlement.idempotency_key.as_str();
        let mut tx = self.pool().begin().await.map_err(DatabaseError::from)?;

        LedgerRepository::prune_keys(&mut *tx, Utc::now() - self.key_ttl).await?;

        let claimed = LedgerRepository::claim_key(
            &mut *tx,
            key,
            settlement.settlement_id.into(),
            &settlement.fingerprint,
        )
        .await?;
        if !claimed {
            let row = LedgerRepository::fetch_key(&mut *tx, key)
                .await?
                .ok_or_else(|| LedgerError::transient_storage("idempotency key vanished during lookup"))?;
            tx.rollback().await.map_err(DatabaseError::from)?;
            debug!(key, "Replaying committed settlement");
            return row_to_key_record(row).replay(&settlement.idempotency_key, &settlement.fingerprint);
        }

        let ids: Vec<Uuid> = settlement.participants.iter().map(|id| (*id).into()).collect();
        let locked = LedgerRepository::lock_accounts(&mut *tx, &ids).await?;
        require_active(&locked, &settlement.participants)?;

        let mut entry_ids = Vec::with_capacity(settlement.entries.len());
        for entry in &settlement.entries {
            let (entry_id, _) = write_entry(&mut *tx, entry).await?;
            entry_ids.push(entry_id);
        }

        let raw_ids: Vec<Uuid> = entry_ids.iter().map(|id| (*id).into()).collect();
        LedgerRepository::complete_key(&mut *tx, key, &raw_ids).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(SettlementReceipt {
            settlement_id: settlement.settlement_id,
            entry_ids,
            replayed: false,
        })
    }

    async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.fetch_account(id).await?;
        let rows = self.repository.entries_for_account(id.into()).await?;
        Ok(rows.into_iter().map(|row| row_to_joined(row).entry).collect())
    }

    async fn all_entries(&self) -> Result<Vec<JoinedEntry>, LedgerError> {
        let rows = self.repository.all_entries().await?;
        Ok(rows.into_iter().map(row_to_joined).collect())
    }

    async fn entries_for_bill(&self, shop: &str, date: NaiveDate) -> Result<Vec<JoinedEntry>, LedgerError> {
        let rows = self.repository.entries_for_bill(shop, date).await?;
        Ok(rows.into_iter().map(row_to_joined).collect())
    }

    async fn entries_for_settlement(&self, settlement_id: SettlementId) -> Result<Vec<JoinedEntry>, LedgerError> {
        let rows = self.repository.entries_for_settlement(settlement_id.into()).await?;
        Ok(rows.into_iter().map(row_to_joined).collect())
    }

    async fn reconcile(&self) -> Result<Vec<BalanceDiscrepancy>, LedgerError> {
        let rows = self.repository.balance_discrepancies().await?;
        Ok(rows
            .into_iter()
            .map(|row| BalanceDiscrepancy {
                account_id: AccountId::from(row.account_id),
                recorded: Money::new(row.recorded),
                computed: Money::new(row.computed),
            })
            .collect())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Inserts one entry and moves the owner's balance; returns the new balance
async fn write_entry(conn: &mut sqlx::PgConnection, entry: &NewEntry) -> Result<(EntryId, Money), LedgerError> {
    if entry.label.trim().is_empty() {
        return Err(LedgerError::validation("entry label must not be empty"));
    }

    let entry_id = EntryId::new();
    LedgerRepository::insert_entry(
        conn,
        &NewEntryRow {
            entry_id: entry_id.into(),
            account_id: entry.account_id.into(),
            entry_date: entry.date,
            amount: entry.amount.amount(),
            label: entry.label.clone(),
            settlement_id: entry.settlement_id.map(Into::into),
        },
    )
    .await?;

    let balance = LedgerRepository::add_to_balance(conn, entry.account_id.into(), entry.amount.amount()).await?;
    Ok((entry_id, Money::new(balance)))
}

/// Fails with the first required account that is missing or deleted
fn require_active(locked: &[AccountRow], required: &[AccountId]) -> Result<(), LedgerError> {
    for id in required {
        let raw: Uuid = (*id).into();
        let active = locked.iter().any(|row| row.account_id == raw && !row.deleted);
        if !active {
            return Err(LedgerError::AccountNotFound(*id));
        }
    }
    Ok(())
}

fn row_to_account(row: AccountRow) -> Account {
    Account {
        id: AccountId::from(row.account_id),
        name: row.name,
        balance: Money::new(row.balance),
        deleted: row.deleted,
    }
}

fn row_to_joined(row: EntryRow) -> JoinedEntry {
    JoinedEntry {
        entry: LedgerEntry {
            id: EntryId::from(row.entry_id),
            sequence: row.entry_seq,
            account_id: AccountId::from(row.account_id),
            date: row.entry_date,
            amount: Money::new(row.amount),
            label: row.label,
            settlement_id: row.settlement_id.map(SettlementId::from),
        },
        account_name: row.account_name,
    }
}

fn row_to_key_record(row: KeyRow) -> KeyRecord {
    KeyRecord {
        settlement_id: SettlementId::from(row.settlement_id),
        fingerprint: row.fingerprint,
        entry_ids: row.entry_ids.into_iter().map(EntryId::from).collect(),
        recorded_at: row.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(id: AccountId, deleted: bool) -> AccountRow {
        AccountRow {
            account_id: id.into(),
            name: "Ali".to_string(),
            balance: dec!(1.5),
            deleted,
        }
    }

    #[test]
    fn test_require_active() {
        let ali = AccountId::new();
        let sara = AccountId::new();

        assert!(require_active(&[row(ali, false), row(sara, false)], &[ali, sara]).is_ok());
        assert!(matches!(
            require_active(&[row(ali, false), row(sara, true)], &[ali, sara]),
            Err(LedgerError::AccountNotFound(id)) if id == sara
        ));
        assert!(matches!(
            require_active(&[row(ali, false)], &[ali, sara]),
            Err(LedgerError::AccountNotFound(id)) if id == sara
        ));
    }

    #[test]
    fn test_row_mapping() {
        let id = AccountId::new();
        let account = row_to_account(row(id, false));
        assert_eq!(account.id, id);
        assert_eq!(account.balance, Money::new(dec!(1.5)));
    }
}
