//! Custom Test Assertions
//!
//! Assertion helpers for ledger types that give more meaningful failure
//! messages than plain `assert_eq!`.

use core_kernel::Money;
use domain_ledger::{Account, BillView, LedgerEntry};

/// Asserts that two Money values differ by at most `tolerance`
pub fn assert_money_approx_eq(actual: Money, expected: Money, tolerance: Money) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that an account's balance equals the sum of its entries
pub fn assert_balance_matches_entries(account: &Account, entries: &[LedgerEntry]) {
    let sum: Money = entries
        .iter()
        .filter(|e| e.account_id == account.id)
        .map(|e| e.amount)
        .sum();
    assert_eq!(
        account.balance, sum,
        "Balance of {} ({}) does not match its entries ({})",
        account.name, account.balance, sum
    );
}

/// Asserts that entries are ordered date descending, then sequence descending
pub fn assert_newest_first(entries: &[LedgerEntry]) {
    for pair in entries.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            (a.date, a.sequence) > (b.date, b.sequence),
            "Entries out of order: ({}, {}) before ({}, {})",
            a.date,
            a.sequence,
            b.date,
            b.sequence
        );
    }
}

/// Asserts that a bill lists exactly the given (name, amount) participants
pub fn assert_participants(bill: &BillView, expected: &[(&str, Money)]) {
    let actual: Vec<(&str, Money)> = bill
        .participants
        .iter()
        .map(|p| (p.name.as_str(), p.amount))
        .collect();
    assert_eq!(actual, expected, "Unexpected participants for {} on {}", bill.shop, bill.date);
}
