//! Unit tests for the Money and Rate types
//!
//! Tests cover construction, rounding, arithmetic, parsing and rates.

use core_kernel::{Money, MoneyError, Rate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_keeps_three_fraction_digits() {
        let m = Money::new(dec!(10));
        assert_eq!(m.amount(), dec!(10.000));
        assert_eq!(m.amount().scale(), 3);
    }

    #[test]
    fn test_new_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(2.0125)).amount(), dec!(2.013));
        assert_eq!(Money::new(dec!(-2.0125)).amount(), dec!(-2.013));
        assert_eq!(Money::new(dec!(2.01249)).amount(), dec!(2.012));
    }

    #[test]
    fn test_from_minor_is_thousandths() {
        assert_eq!(Money::from_minor(10_500).amount(), dec!(10.5));
        assert_eq!(Money::from_minor(-1).amount(), dec!(-0.001));
    }

    #[test]
    fn test_zero_and_default_agree() {
        assert_eq!(Money::zero(), Money::default());
        assert!(Money::zero().is_zero());
    }
}

mod predicates {
    use super::*;

    #[test]
    fn test_sign_predicates() {
        assert!(Money::new(dec!(0.001)).is_positive());
        assert!(Money::new(dec!(-0.001)).is_negative());
        assert!(!Money::zero().is_positive());
        assert!(!Money::zero().is_negative());
    }

    #[test]
    fn test_tiny_amount_rounds_to_zero() {
        let m = Money::new(dec!(0.0004));
        assert!(m.is_zero());
        assert!(!m.is_positive());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_add_sub_neg() {
        let a = Money::new(dec!(10.250));
        let b = Money::new(dec!(4.125));
        assert_eq!((a + b).amount(), dec!(14.375));
        assert_eq!((a - b).amount(), dec!(6.125));
        assert_eq!((-a).amount(), dec!(-10.250));
    }

    #[test]
    fn test_sum_of_amounts() {
        let parts = vec![Money::new(dec!(0.1)), Money::new(dec!(0.2)), Money::new(dec!(0.3))];
        let total: Money = parts.iter().sum();
        assert_eq!(total, Money::new(dec!(0.6)));
        assert_eq!(Money::checked_sum(&parts).unwrap(), total);
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.checked_add(&max), Err(MoneyError::Overflow));
        assert_eq!(max.multiply(dec!(2)), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_abs_diff() {
        let total = Money::new(dec!(30));
        let shares = Money::new(dec!(29.99));
        assert_eq!(total.abs_diff(&shares).unwrap(), Money::new(dec!(0.01)));
        assert_eq!(shares.abs_diff(&total).unwrap(), Money::new(dec!(0.01)));
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_parse_number_string() {
        let m: Money = " 7.5 ".parse().unwrap();
        assert_eq!(m.to_string(), "7.500");
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!("seven".parse::<Money>(), Err(MoneyError::InvalidAmount(_))));
        assert!(matches!("".parse::<Money>(), Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_deserialize_is_exact() {
        let m: Money = serde_json::from_str("\"1.235\"").unwrap();
        assert_eq!(m.amount(), dec!(1.235));
        let padded: Money = serde_json::from_str("\"1.2350\"").unwrap();
        assert_eq!(padded, m);

        assert!(serde_json::from_str::<Money>("\"4.0005\"").is_err());
        assert!(serde_json::from_str::<Money>("\"1.23456\"").is_err());

        let json = serde_json::to_string(&Money::new(dec!(4))).unwrap();
        assert_eq!(json, "\"4.000\"");
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_rate_multiplier() {
        let rate = Rate::from_percentage(dec!(12.5)).unwrap();
        assert_eq!(rate.multiplier(), dec!(1.125));
        assert_eq!(rate.to_string(), "12.5%");
    }

    #[test]
    fn test_rate_apply_rounds_result() {
        let rate = Rate::from_percentage(dec!(5)).unwrap();
        let taxed = rate.apply_to(&Money::new(dec!(3.333))).unwrap();
        // 3.333 * 1.05 = 3.49965
        assert_eq!(taxed.amount(), dec!(3.500));
    }

    #[test]
    fn test_rate_rejects_invalid_values() {
        assert!(matches!(Rate::from_percentage(dec!(-0.5)), Err(MoneyError::InvalidRate(_))));
        assert!(matches!(Rate::from_percentage_f64(f64::NEG_INFINITY), Err(MoneyError::InvalidRate(_))));
        assert!(matches!(Rate::from_percentage_f64(-3.0), Err(MoneyError::InvalidRate(_))));
    }

    #[test]
    fn test_rate_deserialize_validates() {
        assert!(serde_json::from_str::<Rate>("\"5\"").is_ok());
        assert!(serde_json::from_str::<Rate>("\"-5\"").is_err());
    }
}
