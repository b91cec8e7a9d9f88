//! Property-Based Test Generators
//!
//! Proptest strategies for ledger amounts and tax rates.

use chrono::NaiveDate;
use core_kernel::Money;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for positive amounts in thousandths
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(Money::from_minor)
}

/// Strategy for tax percentages between 0 and 100 with two decimals
pub fn tax_percent_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..10_000u32).prop_map(|n| Decimal::new(n as i64, 2))
}

/// Strategy for dates in 2024
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u32..=12, 1u32..=28).prop_map(|(m, d)| NaiveDate::from_ymd_opt(2024, m, d).expect("day 1-28 exists in every month"))
}

/// Strategy for share lists of 1 to `max` positive amounts
pub fn shares_strategy(max: usize) -> impl Strategy<Value = Vec<Money>> {
    prop::collection::vec(positive_money_strategy(), 1..=max)
}
