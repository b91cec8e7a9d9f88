//! Ledger entries
//!
//! An entry is one immutable signed line against exactly one account. Entries
//! are only ever appended; corrections are new entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use core_kernel::{AccountId, EntryId, Money, SettlementId};

/// Label used for direct deposits and withdrawals
pub const DIRECT_ENTRY_LABEL: &str = "direct";

/// One immutable ledger line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier
    pub id: EntryId,
    /// Monotonic insertion sequence, used as the tie-break within a date
    pub sequence: i64,
    /// Owning account
    pub account_id: AccountId,
    /// Calendar day of the entry
    pub date: NaiveDate,
    /// Positive = credit, negative = debit
    pub amount: Money,
    /// [`DIRECT_ENTRY_LABEL`] or the shop name of a bill
    pub label: String,
    /// Settlement that produced this entry, if any
    pub settlement_id: Option<SettlementId>,
}

impl LedgerEntry {
    pub fn is_credit(&self) -> bool {
        self.amount.is_positive()
    }

    pub fn is_debit(&self) -> bool {
        self.amount.is_negative()
    }
}

/// Display ordering: date descending, then insertion order descending
pub fn newest_first(a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
    b.date.cmp(&a.date).then(b.sequence.cmp(&a.sequence))
}

/// An entry waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub amount: Money,
    pub label: String,
    pub settlement_id: Option<SettlementId>,
}

impl NewEntry {
    /// A positive entry of `amount`
    pub fn credit(account_id: AccountId, date: NaiveDate, amount: Money, label: impl Into<String>) -> Self {
        Self {
            account_id,
            date,
            amount: amount.abs(),
            label: label.into(),
            settlement_id: None,
        }
    }

    /// A negative entry of `amount`
    pub fn debit(account_id: AccountId, date: NaiveDate, amount: Money, label: impl Into<String>) -> Self {
        Self {
            account_id,
            date,
            amount: -amount.abs(),
            label: label.into(),
            settlement_id: None,
        }
    }

    /// Tags the entry with the settlement that produced it
    pub fn in_settlement(mut self, settlement_id: SettlementId) -> Self {
        self.settlement_id = Some(settlement_id);
        self
    }
}

/// Outcome of appending one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEntry {
    pub entry_id: EntryId,
    pub account_id: AccountId,
    /// Owning account's balance after the entry
    pub balance: Money,
}
