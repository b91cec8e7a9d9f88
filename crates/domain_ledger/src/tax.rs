//! Proportional tax distribution
//!
//! A percentage surcharge is spread over contributors by scaling each
//! positive share by `1 + rate / 100`. Missing or zero shares are passed
//! through untouched.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{AccountId, Money, Rate};
use crate::error::LedgerError;
use crate::settlement::{Contribution, IdempotencyKey, SettlementRequest};

/// Applies a percentage surcharge to every positive amount
///
/// Amounts are rounded half away from zero to three digits. Order of the
/// input is preserved, so callers may collect into whatever map they use.
///
/// # Errors
///
/// Returns `InvalidRate` if `rate_percent` is negative
///
/// # Example
///
/// ```rust,ignore
/// let taxed: BTreeMap<_, _> = apply_tax(
///     BTreeMap::from([("A", Some(Money::new(dec!(10))))]),
///     dec!(5),
/// )?
/// .into_iter()
/// .collect();
/// ```
pub fn apply_tax<K, I>(contributions: I, rate_percent: Decimal) -> Result<Vec<(K, Option<Money>)>, LedgerError>
where
    I: IntoIterator<Item = (K, Option<Money>)>,
{
    let rate = Rate::from_percentage(rate_percent)?;
    contributions
        .into_iter()
        .map(|(key, amount)| match amount {
            Some(base) if base.is_positive() => Ok((key, Some(rate.apply_to(&base)?))),
            other => Ok((key, other)),
        })
        .collect()
}

/// A bill being assembled before settlement
///
/// Tracks whether tax has been applied so that it can never be applied twice.
#[derive(Debug, Clone)]
pub struct BillDraft {
    payer_id: AccountId,
    date: NaiveDate,
    shop: String,
    contributions: Vec<(AccountId, Option<Money>)>,
    tax_applied: bool,
}

impl BillDraft {
    pub fn new(payer_id: AccountId, date: NaiveDate, shop: impl Into<String>) -> Self {
        Self {
            payer_id,
            date,
            shop: shop.into(),
            contributions: Vec::new(),
            tax_applied: false,
        }
    }

    /// Adds a contributor; `None` marks a contributor with no amount yet
    pub fn contribute(mut self, account_id: AccountId, amount: Option<Money>) -> Self {
        self.contributions.push((account_id, amount));
        self
    }

    pub fn contributions(&self) -> &[(AccountId, Option<Money>)] {
        &self.contributions
    }

    pub fn is_tax_applied(&self) -> bool {
        self.tax_applied
    }

    /// Applies the surcharge to every contribution, once
    pub fn apply_tax(&mut self, rate_percent: Decimal) -> Result<(), LedgerError> {
        if self.tax_applied {
            return Err(LedgerError::TaxAlreadyApplied);
        }
        self.contributions = apply_tax(self.contributions.iter().cloned(), rate_percent)?;
        self.tax_applied = true;
        Ok(())
    }

    /// Sum of all present shares
    pub fn share_total(&self) -> Result<Money, LedgerError> {
        Ok(Money::checked_sum(self.contributions.iter().filter_map(|(_, m)| m.as_ref()))?)
    }

    /// Turns the draft into a settlement request
    ///
    /// `total` defaults to the sum of shares. Contributors without an amount
    /// are dropped.
    pub fn into_request(self, total: Option<Money>, idempotency_key: IdempotencyKey) -> Result<SettlementRequest, LedgerError> {
        let total = match total {
            Some(total) => total,
            None => self.share_total()?,
        };
        let contributions = self
            .contributions
            .into_iter()
            .filter_map(|(account_id, share)| share.map(|share| Contribution { account_id, share }))
            .collect();

        Ok(SettlementRequest {
            payer_id: self.payer_id,
            total,
            date: self.date,
            shop: self.shop,
            contributions,
            idempotency_key,
        })
    }
}
