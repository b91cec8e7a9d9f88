//! Fixed-point money and percentage rates
//!
//! Every amount in the ledger has exactly three fractional digits. Values are
//! backed by `rust_decimal` so sums, tax multiplication and tolerance checks
//! never pass through binary floating point.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount with three fractional digits
///
/// Construction always rounds half away from zero to [`Money::SCALE`] digits,
/// so two `Money` values that compare equal also print identically.
/// Deserialization is strict instead: more than three fractional digits is
/// an error, never a silent rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "Decimal")]
pub struct Money {
    amount: Decimal,
}

impl Money {
    /// Number of fractional digits kept for every amount
    pub const SCALE: u32 = 3;

    /// Creates a new Money value, rounding to three fractional digits
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(Self::SCALE);
        Self { amount }
    }

    /// Creates Money only if `amount` needs no rounding
    pub fn from_exact(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.normalize().scale() > Self::SCALE {
            return Err(MoneyError::InvalidAmount(format!(
                "{} has more than {} fractional digits",
                amount,
                Self::SCALE
            )));
        }
        Ok(Self::new(amount))
    }

    /// Largest magnitude an amount or balance may take: 15 integer digits
    pub fn ledger_max() -> Self {
        Self::from_minor(999_999_999_999_999_999)
    }

    /// True if the magnitude does not exceed [`Money::ledger_max`]
    pub fn is_within_ledger_range(&self) -> bool {
        self.amount.abs() <= Self::ledger_max().amount
    }

    /// Creates Money from an integer number of thousandths
    pub fn from_minor(thousandths: i64) -> Self {
        Self::new(Decimal::new(thousandths, Self::SCALE))
    }

    /// The zero amount
    pub fn zero() -> Self {
        Self::new(dec!(0))
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self::new(self.amount.abs())
    }

    /// Addition that reports overflow instead of panicking
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.amount
            .checked_add(other.amount)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Subtraction that reports overflow instead of panicking
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.amount
            .checked_sub(other.amount)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies by a scalar, rounding the product to three digits
    pub fn multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        self.amount
            .checked_mul(factor)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Absolute difference between two amounts
    pub fn abs_diff(&self, other: &Money) -> Result<Money, MoneyError> {
        Ok(self.checked_sub(other)?.abs())
    }

    /// Sums an iterator of amounts, reporting overflow
    pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Money>) -> Result<Money, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal {
        money.amount
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_exact(amount).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MoneyError::InvalidAmount("amount is empty".to_string()));
        }
        Decimal::from_str(trimmed)
            .map(Self::new)
            .map_err(|_| MoneyError::InvalidAmount(format!("'{}' is not a number", trimmed)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.amount + other.amount)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.amount - other.amount)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

/// A percentage surcharge such as a service tax
///
/// Stored as the percentage itself (5 means 5%), never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate {
    percentage: Decimal,
}

impl Rate {
    /// Creates a rate from a percentage (e.g. 5 for 5%)
    pub fn from_percentage(percentage: Decimal) -> Result<Self, MoneyError> {
        if percentage.is_sign_negative() && !percentage.is_zero() {
            return Err(MoneyError::InvalidRate(format!(
                "rate must be >= 0, got {}",
                percentage
            )));
        }
        Ok(Self { percentage })
    }

    /// Creates a rate from a floating point percentage, rejecting NaN and infinities
    pub fn from_percentage_f64(percentage: f64) -> Result<Self, MoneyError> {
        if !percentage.is_finite() {
            return Err(MoneyError::InvalidRate(format!(
                "rate must be a finite number, got {}",
                percentage
            )));
        }
        let value = Decimal::try_from(percentage)
            .map_err(|_| MoneyError::InvalidRate(format!("rate {} is out of range", percentage)))?;
        Self::from_percentage(value)
    }

    /// A rate of 0%
    pub fn zero() -> Self {
        Self { percentage: Decimal::ZERO }
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.percentage
    }

    /// The factor an amount is multiplied by: `1 + rate / 100`
    pub fn multiplier(&self) -> Decimal {
        Decimal::ONE + self.percentage / dec!(100)
    }

    /// Returns `base` with this surcharge added, rounded half away from zero
    pub fn apply_to(&self, base: &Money) -> Result<Money, MoneyError> {
        base.multiply(self.multiplier())
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_percentage(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Decimal {
        rate.percentage
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rounds_to_three_digits() {
        assert_eq!(Money::new(dec!(1.0005)).amount(), dec!(1.001));
        assert_eq!(Money::new(dec!(-1.0005)).amount(), dec!(-1.001));
        assert_eq!(Money::new(dec!(1.0004)).amount(), dec!(1.000));
    }

    #[test]
    fn test_money_display_has_three_digits() {
        assert_eq!(Money::new(dec!(10)).to_string(), "10.000");
        assert_eq!(Money::from_minor(-4500).to_string(), "-4.500");
    }

    #[test]
    fn test_money_parse() {
        let m: Money = "12.3456".parse().unwrap();
        assert_eq!(m.amount(), dec!(12.346));
        assert!(matches!("abc".parse::<Money>(), Err(MoneyError::InvalidAmount(_))));
        assert!(matches!("  ".parse::<Money>(), Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_from_exact_rejects_extra_digits() {
        assert_eq!(Money::from_exact(dec!(4.500)).unwrap(), Money::from_minor(4500));
        assert_eq!(Money::from_exact(dec!(4.50000)).unwrap(), Money::from_minor(4500));
        assert!(matches!(Money::from_exact(dec!(4.0005)), Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_ledger_range() {
        assert!(Money::ledger_max().is_within_ledger_range());
        assert!((-Money::ledger_max()).is_within_ledger_range());
        assert_eq!(Money::ledger_max().to_string(), "999999999999999.999");

        let over = Money::ledger_max().checked_add(&Money::from_minor(1)).unwrap();
        assert!(!over.is_within_ledger_range());
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::from_percentage(dec!(5)).unwrap();
        let taxed = rate.apply_to(&Money::new(dec!(10))).unwrap();
        assert_eq!(taxed.amount(), dec!(10.500));
    }

    #[test]
    fn test_rate_rejects_negative_and_non_finite() {
        assert!(Rate::from_percentage(dec!(-1)).is_err());
        assert!(Rate::from_percentage_f64(f64::NAN).is_err());
        assert!(Rate::from_percentage_f64(f64::INFINITY).is_err());
        assert!(Rate::from_percentage_f64(0.0).is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_addition_is_exact(
            a in -1_000_000_000i64..1_000_000_000i64,
            b in -1_000_000_000i64..1_000_000_000i64
        ) {
            let sum = Money::from_minor(a) + Money::from_minor(b);
            prop_assert_eq!(sum, Money::from_minor(a + b));
        }

        #[test]
        fn zero_rate_is_identity(thousandths in 0i64..1_000_000_000i64) {
            let base = Money::from_minor(thousandths);
            prop_assert_eq!(Rate::zero().apply_to(&base).unwrap(), base);
        }
    }
}
