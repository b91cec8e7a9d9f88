//! Ledger repository implementation
//!
//! Row-level access to `accounts`, `entries` and `settlement_keys`. Methods
//! that take a `&mut PgConnection` are meant to run inside a transaction
//! opened by the caller; the rest use the pool directly.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

const ENTRY_COLUMNS: &str = r#"
    e.entry_id, e.entry_seq, e.account_id, e.entry_date, e.amount,
    e.label, e.settlement_id, a.name AS account_name
"#;

const NEWEST_FIRST: &str = "ORDER BY e.entry_date DESC, e.entry_seq DESC";

/// Repository for accounts, entries and settlement keys
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn insert_account(&self, account_id: Uuid, name: &str, balance: Decimal) -> Result<AccountRow, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (account_id, name, balance, deleted)
            VALUES ($1, $2, $3, FALSE)
            RETURNING account_id, name, balance, deleted
            "#,
        )
        .bind(account_id)
        .bind(name)
        .bind(balance)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns true if an active account already uses `name`
    pub async fn active_name_exists(&self, name: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE name = $1 AND NOT deleted)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn fetch_account(&self, account_id: Uuid) -> Result<Option<AccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT account_id, name, balance, deleted FROM accounts WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Active accounts in creation order
    pub async fn list_active(&self) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT account_id, name, balance, deleted
            FROM accounts
            WHERE NOT deleted
            ORDER BY created_at, account_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Renames an active account; `None` if no active account matched
    pub async fn rename_account(&self, account_id: Uuid, name: &str) -> Result<Option<AccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts SET name = $2
            WHERE account_id = $1 AND NOT deleted
            RETURNING account_id, name, balance, deleted
            "#,
        )
        .bind(account_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Flags an account deleted and overwrites its name
    ///
    /// Returns false if nothing changed, either because the account is
    /// unknown or because it was already deleted.
    pub async fn mark_deleted(&self, account_id: Uuid, sentinel: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE accounts SET deleted = TRUE, name = $2 WHERE account_id = $1 AND NOT deleted",
        )
        .bind(account_id)
        .bind(sentinel)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Locks the given accounts for the rest of the transaction
    ///
    /// Rows are locked in key order so that concurrent settlements over
    /// overlapping accounts cannot deadlock each other.
    pub async fn lock_accounts(conn: &mut PgConnection, account_ids: &[Uuid]) -> Result<Vec<AccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT account_id, name, balance, deleted
            FROM accounts
            WHERE account_id = ANY($1)
            ORDER BY account_id
            FOR UPDATE
            "#,
        )
        .bind(account_ids)
        .fetch_all(conn)
        .await?;

        Ok(rows)
    }

    pub async fn add_to_balance(conn: &mut PgConnection, account_id: Uuid, delta: Decimal) -> Result<Decimal, DatabaseError> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            "UPDATE accounts SET balance = balance + $2 WHERE account_id = $1 RETURNING balance",
        )
        .bind(account_id)
        .bind(delta)
        .fetch_one(conn)
        .await?;

        Ok(balance)
    }

    // ========================================================================
    // Entries
    // ========================================================================

    pub async fn insert_entry(conn: &mut PgConnection, entry: &NewEntryRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO entries (entry_id, account_id, entry_date, amount, label, settlement_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.account_id)
        .bind(entry.entry_date)
        .bind(entry.amount)
        .bind(&entry.label)
        .bind(entry.settlement_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn entries_for_account(&self, account_id: Uuid) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e JOIN accounts a USING (account_id) WHERE e.account_id = $1 {NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn all_entries(&self) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e JOIN accounts a USING (account_id) {NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, EntryRow>(&sql).fetch_all(&self.pool).await?;

        Ok(rows)
    }

    pub async fn entries_for_bill(&self, shop: &str, date: NaiveDate) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e JOIN accounts a USING (account_id) \
             WHERE e.label = $1 AND e.entry_date = $2 {NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(shop)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn entries_for_settlement(&self, settlement_id: Uuid) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e JOIN accounts a USING (account_id) \
             WHERE e.settlement_id = $1 {NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(settlement_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Accounts whose stored balance differs from the sum of their entries
    pub async fn balance_discrepancies(&self) -> Result<Vec<DiscrepancyRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DiscrepancyRow>(
            r#"
            SELECT a.account_id, a.balance AS recorded, COALESCE(SUM(e.amount), 0) AS computed
            FROM accounts a
            LEFT JOIN entries e USING (account_id)
            GROUP BY a.account_id, a.balance
            HAVING a.balance <> COALESCE(SUM(e.amount), 0)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ========================================================================
    // Settlement keys
    // ========================================================================

    pub async fn prune_keys(conn: &mut PgConnection, older_than: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM settlement_keys WHERE created_at < $1")
            .bind(older_than)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Reserves a key for this transaction
    ///
    /// Returns false if the key is already recorded. A concurrent transaction
    /// holding the same key blocks this call until it commits or rolls back.
    pub async fn claim_key(
        conn: &mut PgConnection,
        key: &str,
        settlement_id: Uuid,
        fingerprint: &str,
    ) -> Result<bool, DatabaseError> {
        let claimed = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO settlement_keys (idempotency_key, settlement_id, fingerprint, entry_ids)
            VALUES ($1, $2, $3, '{}')
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING idempotency_key
            "#,
        )
        .bind(key)
        .bind(settlement_id)
        .bind(fingerprint)
        .fetch_optional(conn)
        .await?;

        Ok(claimed.is_some())
    }

    pub async fn fetch_key(conn: &mut PgConnection, key: &str) -> Result<Option<KeyRow>, DatabaseError> {
        let row = sqlx::query_as::<_, KeyRow>(
            r#"
            SELECT settlement_id, fingerprint, entry_ids, created_at
            FROM settlement_keys
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    pub async fn complete_key(conn: &mut PgConnection, key: &str, entry_ids: &[Uuid]) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE settlement_keys SET entry_ids = $2 WHERE idempotency_key = $1")
            .bind(key)
            .bind(entry_ids)
            .execute(conn)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Database Row Types
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub name: String,
    pub balance: Decimal,
    pub deleted: bool,
}

/// An entry joined with its owner's current name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    pub entry_id: Uuid,
    pub entry_seq: i64,
    pub account_id: Uuid,
    pub entry_date: NaiveDate,
    pub amount: Decimal,
    pub label: String,
    pub settlement_id: Option<Uuid>,
    pub account_name: String,
}

#[derive(Debug, Clone)]
pub struct NewEntryRow {
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub entry_date: NaiveDate,
    pub amount: Decimal,
    pub label: String,
    pub settlement_id: Option<Uuid>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeyRow {
    pub settlement_id: Uuid,
    pub fingerprint: String,
    pub entry_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscrepancyRow {
    pub account_id: Uuid,
    pub recorded: Decimal,
    pub computed: Decimal,
}
