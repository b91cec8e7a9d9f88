//! Entry DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::Money;
use domain_ledger::{JoinedEntry, LedgerEntry};

/// One entry of a single account's history
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: Money,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<Uuid>,
}

impl From<LedgerEntry> for EntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id.into(),
            date: entry.date,
            amount: entry.amount,
            label: entry.label,
            settlement_id: entry.settlement_id.map(Into::into),
        }
    }
}

/// One entry of the global history, attributed to its owner's current name
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinedEntryResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    pub account_id: Uuid,
    pub account_name: String,
    pub amount: Money,
    pub label: String,
}

impl From<JoinedEntry> for JoinedEntryResponse {
    fn from(row: JoinedEntry) -> Self {
        Self {
            id: row.entry.id.into(),
            date: row.entry.date,
            account_id: row.entry.account_id.into(),
            account_name: row.account_name,
            amount: row.entry.amount,
            label: row.entry.label,
        }
    }
}
