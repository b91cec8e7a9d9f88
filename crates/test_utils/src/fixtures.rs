//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for ledger tests.

use chrono::NaiveDate;
use core_kernel::Money;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn ten() -> Money {
        Money::new(dec!(10.000))
    }

    pub fn six() -> Money {
        Money::new(dec!(6.000))
    }

    pub fn four() -> Money {
        Money::new(dec!(4.000))
    }
}

/// Fixture for dates
pub struct DateFixtures;

impl DateFixtures {
    pub fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
    }
}

/// Fixture for names and labels
pub struct StringFixtures;

impl StringFixtures {
    pub fn payer() -> &'static str {
        "Ali"
    }

    pub fn contributor() -> &'static str {
        "Sara"
    }

    pub fn shop() -> &'static str {
        "Cafe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_amounts_balance() {
        assert_eq!(MoneyFixtures::six() + MoneyFixtures::four(), MoneyFixtures::ten());
    }
}
