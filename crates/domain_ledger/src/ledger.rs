//! Append-only balance ledger
//!
//! The ledger owns every account and every entry and is the only place where
//! balances change.
//!
//! # Invariants
//!
//! - An account's balance always equals the sum of its entry amounts
//! - Entries are never modified or removed
//! - A batch of entries is applied completely or not at all

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use core_kernel::{AccountId, EntryId, Money, SettlementId};
use crate::account::Account;
use crate::entry::{AppliedEntry, LedgerEntry, NewEntry};
use crate::error::LedgerError;
use crate::reconstruction::JoinedEntry;

/// In-process ledger state
///
/// Not synchronized; adapters wrap it in a lock so that a batch and the
/// reads that follow it see a consistent view.
#[derive(Debug, Default)]
pub struct Ledger {
    /// Accounts in opening order
    accounts: Vec<Account>,
    /// Position of each account in `accounts`
    index: HashMap<AccountId, usize>,
    /// Entries kept sorted by (date, sequence) ascending
    entries: Vec<LedgerEntry>,
    /// Sequence number handed to the next appended entry
    next_sequence: i64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an account with a zero balance
    ///
    /// Duplicate names are allowed but logged.
    pub fn open_account(&mut self, name: &str) -> Result<Account, LedgerError> {
        let account = Account::open(name)?;
        if self.list_active().any(|a| a.name == account.name) {
            warn!(name = %account.name, "Opening account with a name that is already in use");
        }

        self.index.insert(account.id, self.accounts.len());
        self.accounts.push(account.clone());
        Ok(account)
    }

    /// Gets an account by ID, including soft-deleted ones
    pub fn account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.index
            .get(&id)
            .map(|&i| &self.accounts[i])
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Gets an account by ID, treating soft-deleted accounts as missing
    pub fn active_account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.account(id)
            .ok()
            .filter(|a| a.is_active())
            .ok_or(LedgerError::AccountNotFound(id))
    }

    fn active_account_mut(&mut self, id: AccountId) -> Result<&mut Account, LedgerError> {
        let i = *self.index.get(&id).ok_or(LedgerError::AccountNotFound(id))?;
        let account = &mut self.accounts[i];
        if !account.is_active() {
            return Err(LedgerError::AccountNotFound(id));
        }
        Ok(account)
    }

    /// All accounts that are not soft-deleted, in opening order
    pub fn list_active(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.iter().filter(|a| a.is_active())
    }

    /// Changes an active account's display name
    pub fn rename_account(&mut self, id: AccountId, name: &str) -> Result<Account, LedgerError> {
        let account = self.active_account_mut(id)?;
        account.rename(name)?;
        Ok(account.clone())
    }

    /// Soft-deletes an account
    ///
    /// Returns `Ok(false)` if the account was already deleted. Its entries are
    /// left untouched.
    pub fn soft_delete(&mut self, id: AccountId) -> Result<bool, LedgerError> {
        let i = *self.index.get(&id).ok_or(LedgerError::AccountNotFound(id))?;
        Ok(self.accounts[i].soft_delete())
    }

    /// Appends one entry and updates the owning balance
    pub fn apply_entry(&mut self, entry: NewEntry) -> Result<AppliedEntry, LedgerError> {
        let mut applied = self.apply_batch(vec![entry])?;
        applied
            .pop()
            .ok_or_else(|| LedgerError::storage("empty batch result"))
    }

    /// Appends several entries as one unit
    ///
    /// Every target account is checked and every resulting balance computed
    /// before anything is written, so a failing batch leaves the ledger
    /// exactly as it was.
    pub fn apply_batch(&mut self, entries: Vec<NewEntry>) -> Result<Vec<AppliedEntry>, LedgerError> {
        let mut staged: HashMap<AccountId, Money> = HashMap::new();
        for entry in &entries {
            if entry.label.trim().is_empty() {
                return Err(LedgerError::validation("entry label must not be empty"));
            }
            let current = match staged.get(&entry.account_id) {
                Some(balance) => *balance,
                None => self.active_account(entry.account_id)?.balance,
            };
            let next = current.checked_add(&entry.amount)?;
            if !next.is_within_ledger_range() {
                return Err(LedgerError::validation(format!(
                    "balance of {} would leave the ledger range: {}",
                    entry.account_id, next
                )));
            }
            staged.insert(entry.account_id, next);
        }

        let mut applied = Vec::with_capacity(entries.len());
        for new_entry in entries {
            let i = self.index[&new_entry.account_id];
            let account = &mut self.accounts[i];
            account.balance = account.balance + new_entry.amount;
            let balance = account.balance;

            let entry = LedgerEntry {
                id: EntryId::new(),
                sequence: self.next_sequence,
                account_id: new_entry.account_id,
                date: new_entry.date,
                amount: new_entry.amount,
                label: new_entry.label,
                settlement_id: new_entry.settlement_id,
            };
            self.next_sequence += 1;

            applied.push(AppliedEntry {
                entry_id: entry.id,
                account_id: entry.account_id,
                balance,
            });

            let pos = self.entries.partition_point(|e| e.date <= entry.date);
            self.entries.insert(pos, entry);
        }

        Ok(applied)
    }

    /// Entries of one account, newest first
    ///
    /// The iterator is lazy; call again to restart.
    pub fn entries_for(&self, id: AccountId) -> impl Iterator<Item = &LedgerEntry> + '_ {
        self.entries.iter().rev().filter(move |e| e.account_id == id)
    }

    /// Every entry, newest first, joined with its owner's current name
    pub fn all_entries(&self) -> impl Iterator<Item = (&LedgerEntry, &str)> + '_ {
        self.entries.iter().rev().map(move |e| (e, self.owner_name(e.account_id)))
    }

    /// Entries whose label and date match a bill key
    pub fn entries_for_bill(&self, shop: &str, date: NaiveDate) -> Vec<JoinedEntry> {
        self.joined(|e| e.date == date && e.label == shop)
    }

    /// Entries written by one settlement
    pub fn entries_for_settlement(&self, settlement_id: SettlementId) -> Vec<JoinedEntry> {
        self.joined(|e| e.settlement_id == Some(settlement_id))
    }

    fn joined(&self, predicate: impl Fn(&LedgerEntry) -> bool) -> Vec<JoinedEntry> {
        self.all_entries()
            .filter(|(e, _)| predicate(e))
            .map(|(e, name)| JoinedEntry {
                entry: e.clone(),
                account_name: name.to_string(),
            })
            .collect()
    }

    fn owner_name(&self, id: AccountId) -> &str {
        self.index
            .get(&id)
            .map(|&i| self.accounts[i].name.as_str())
            .unwrap_or_default()
    }

    /// Recomputes every balance from its entries and reports mismatches
    pub fn reconcile(&self) -> Vec<BalanceDiscrepancy> {
        let mut sums: HashMap<AccountId, Money> = HashMap::new();
        for entry in &self.entries {
            let sum = sums.entry(entry.account_id).or_default();
            *sum = *sum + entry.amount;
        }

        self.accounts
            .iter()
            .filter_map(|account| {
                let computed = sums.get(&account.id).copied().unwrap_or_default();
                (computed != account.balance).then(|| BalanceDiscrepancy {
                    account_id: account.id,
                    recorded: account.balance,
                    computed,
                })
            })
            .collect()
    }
}

/// An account whose stored balance disagrees with its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDiscrepancy {
    pub account_id: AccountId,
    pub recorded: Money,
    pub computed: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DIRECT_ENTRY_LABEL;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_apply_entry_updates_balance() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();

        let applied = ledger
            .apply_entry(NewEntry::credit(ali.id, day(1), Money::new(dec!(10)), DIRECT_ENTRY_LABEL))
            .unwrap();
        assert_eq!(applied.balance, Money::new(dec!(10)));

        let applied = ledger
            .apply_entry(NewEntry::debit(ali.id, day(1), Money::new(dec!(12.5)), DIRECT_ENTRY_LABEL))
            .unwrap();
        assert_eq!(applied.balance, Money::new(dec!(-2.5)));
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn test_batch_with_unknown_account_writes_nothing() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();

        let result = ledger.apply_batch(vec![
            NewEntry::credit(ali.id, day(1), Money::new(dec!(10)), "Cafe"),
            NewEntry::debit(AccountId::new(), day(1), Money::new(dec!(10)), "Cafe"),
        ]);

        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
        assert_eq!(ledger.account(ali.id).unwrap().balance, Money::zero());
        assert_eq!(ledger.all_entries().count(), 0);
    }

    #[test]
    fn test_balance_cannot_leave_ledger_range() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();
        ledger
            .apply_entry(NewEntry::credit(ali.id, day(1), Money::ledger_max(), DIRECT_ENTRY_LABEL))
            .unwrap();

        let result = ledger.apply_entry(NewEntry::credit(ali.id, day(1), Money::from_minor(1), DIRECT_ENTRY_LABEL));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(ledger.account(ali.id).unwrap().balance, Money::ledger_max());
        assert_eq!(ledger.all_entries().count(), 1);
    }

    #[test]
    fn test_deleted_account_rejects_entries() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();
        ledger.soft_delete(ali.id).unwrap();

        let result = ledger.apply_entry(NewEntry::credit(ali.id, day(1), Money::new(dec!(1)), DIRECT_ENTRY_LABEL));
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }

    #[test]
    fn test_entries_are_newest_first_with_backdating() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();
        for (d, amount) in [(2, dec!(1)), (1, dec!(2)), (2, dec!(3))] {
            ledger
                .apply_entry(NewEntry::credit(ali.id, day(d), Money::new(amount), DIRECT_ENTRY_LABEL))
                .unwrap();
        }

        let amounts: Vec<_> = ledger.entries_for(ali.id).map(|e| e.amount.amount()).collect();
        assert_eq!(amounts, vec![dec!(3), dec!(1), dec!(2)]);

        // restartable
        assert_eq!(ledger.entries_for(ali.id).count(), 3);
    }

    #[test]
    fn test_soft_delete_keeps_history_under_sentinel_name() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();
        ledger
            .apply_entry(NewEntry::credit(ali.id, day(1), Money::new(dec!(5)), DIRECT_ENTRY_LABEL))
            .unwrap();

        assert!(ledger.soft_delete(ali.id).unwrap());
        assert!(!ledger.soft_delete(ali.id).unwrap());

        assert_eq!(ledger.list_active().count(), 0);
        let (_, name) = ledger.all_entries().next().unwrap();
        assert_eq!(name, crate::account::DELETED_ACCOUNT_NAME);
    }

    #[test]
    fn test_rename_is_reflected_in_joined_entries() {
        let mut ledger = Ledger::new();
        let ali = ledger.open_account("Ali").unwrap();
        ledger
            .apply_entry(NewEntry::credit(ali.id, day(1), Money::new(dec!(5)), "Cafe"))
            .unwrap();
        ledger.rename_account(ali.id, "Alistair").unwrap();

        let rows = ledger.entries_for_bill("Cafe", day(1));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account_name, "Alistair");
    }
}
