//! Bill settlement
//!
//! A settlement credits the payer with the full bill and debits every
//! contributor with their share, all under one settlement id. This module
//! holds the pure part: request validation, the posting plan and the
//! receipt. The atomic commit lives in the store adapters, the retry loop in
//! [`crate::service::LedgerService`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

use core_kernel::{AccountId, EntryId, Money, SettlementId};
use crate::entry::{NewEntry, DIRECT_ENTRY_LABEL};
use crate::error::LedgerError;

/// Largest accepted gap between a bill total and the sum of its shares
pub fn settlement_tolerance() -> Money {
    Money::from_minor(10)
}

const MAX_KEY_LEN: usize = 128;

/// Client-generated token that makes a settlement safe to resubmit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("idempotency key must not be empty"));
        }
        if trimmed.len() > MAX_KEY_LEN {
            return Err(LedgerError::validation(format!(
                "idempotency key must be at most {} bytes",
                MAX_KEY_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One contributor's share of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub account_id: AccountId,
    pub share: Money,
}

/// Everything needed to settle one bill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub payer_id: AccountId,
    pub total: Money,
    pub date: NaiveDate,
    pub shop: String,
    pub contributions: Vec<Contribution>,
    pub idempotency_key: IdempotencyKey,
}

impl SettlementRequest {
    /// Checks the request without touching any account
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive total, a blank or reserved shop, a
    ///   negative share, no positive share at all, or any amount above
    ///   [`Money::ledger_max`]
    /// - `UnbalancedSettlement` if shares miss the total by more than
    ///   [`settlement_tolerance`]
    pub fn validate(&self) -> Result<(), LedgerError> {
        if !self.total.is_positive() {
            return Err(LedgerError::validation(format!(
                "bill total must be positive, got {}",
                self.total
            )));
        }
        if !self.total.is_within_ledger_range() {
            return Err(LedgerError::validation(format!(
                "bill total must not exceed {}, got {}",
                Money::ledger_max(),
                self.total
            )));
        }
        let shop = self.shop.trim();
        if shop.is_empty() {
            return Err(LedgerError::validation("shop label must not be empty"));
        }
        if shop == DIRECT_ENTRY_LABEL {
            return Err(LedgerError::validation(format!(
                "'{}' is reserved for direct entries and cannot name a shop",
                DIRECT_ENTRY_LABEL
            )));
        }
        if let Some(c) = self.contributions.iter().find(|c| c.share.is_negative()) {
            return Err(LedgerError::validation(format!(
                "share for {} must not be negative, got {}",
                c.account_id, c.share
            )));
        }
        if let Some(c) = self.contributions.iter().find(|c| !c.share.is_within_ledger_range()) {
            return Err(LedgerError::validation(format!(
                "share for {} must not exceed {}, got {}",
                c.account_id,
                Money::ledger_max(),
                c.share
            )));
        }
        if !self.contributions.iter().any(|c| c.share.is_positive()) {
            return Err(LedgerError::validation("at least one contribution must be positive"));
        }

        let shares = Money::checked_sum(self.contributions.iter().map(|c| &c.share))?;
        if self.total.abs_diff(&shares)? > settlement_tolerance() {
            return Err(LedgerError::UnbalancedSettlement {
                total: self.total,
                shares,
            });
        }
        Ok(())
    }

    /// Canonical text form used to tell a replay from a key reuse
    pub fn fingerprint(&self) -> String {
        let mut out = format!(
            "{}|{}|{}|{}",
            self.payer_id.as_uuid(),
            self.total,
            self.date,
            self.shop.trim()
        );
        for c in &self.contributions {
            let _ = write!(out, "|{}:{}", c.account_id.as_uuid(), c.share);
        }
        out
    }

    /// Validates the request and lays out the entries to write
    ///
    /// The payer credit comes first, then one debit per positive share in
    /// contribution order.
    pub fn prepare(&self) -> Result<PreparedSettlement, LedgerError> {
        self.validate()?;

        let settlement_id = SettlementId::new();
        let shop = self.shop.trim().to_string();

        let mut entries = Vec::with_capacity(self.contributions.len() + 1);
        entries.push(NewEntry::credit(self.payer_id, self.date, self.total, shop.clone()).in_settlement(settlement_id));
        entries.extend(
            self.contributions
                .iter()
                .filter(|c| c.share.is_positive())
                .map(|c| NewEntry::debit(c.account_id, self.date, c.share, shop.clone()).in_settlement(settlement_id)),
        );

        let mut participants: Vec<AccountId> = std::iter::once(self.payer_id)
            .chain(self.contributions.iter().map(|c| c.account_id))
            .collect();
        participants.sort();
        participants.dedup();

        Ok(PreparedSettlement {
            settlement_id,
            idempotency_key: self.idempotency_key.clone(),
            fingerprint: self.fingerprint(),
            participants,
            entries,
        })
    }
}

/// A validated settlement ready for an atomic commit
#[derive(Debug, Clone)]
pub struct PreparedSettlement {
    pub settlement_id: SettlementId,
    pub idempotency_key: IdempotencyKey,
    pub fingerprint: String,
    /// Every account that must be active, sorted and deduplicated
    pub participants: Vec<AccountId>,
    pub entries: Vec<NewEntry>,
}

/// Result of a settlement commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub settlement_id: SettlementId,
    pub entry_ids: Vec<EntryId>,
    /// True when the key had already been committed and nothing was written
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(total: rust_decimal::Decimal, shares: &[rust_decimal::Decimal]) -> SettlementRequest {
        SettlementRequest {
            payer_id: AccountId::new(),
            total: Money::new(total),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            shop: "Cafe".to_string(),
            contributions: shares
                .iter()
                .map(|s| Contribution { account_id: AccountId::new(), share: Money::new(*s) })
                .collect(),
            idempotency_key: IdempotencyKey::parse("key").unwrap(),
        }
    }

    #[test]
    fn test_tolerance_boundary() {
        assert!(request(dec!(30.000), &[dec!(20), dec!(9.990)]).validate().is_ok());
        assert!(matches!(
            request(dec!(30.000), &[dec!(20), dec!(9.980)]).validate(),
            Err(LedgerError::UnbalancedSettlement { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_total_and_negative_share() {
        assert!(matches!(request(dec!(0), &[dec!(0)]).validate(), Err(LedgerError::Validation(_))));
        assert!(matches!(
            request(dec!(10), &[dec!(12), dec!(-2)]).validate(),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_direct_label_as_shop() {
        let mut req = request(dec!(10), &[dec!(10)]);
        req.shop = " direct ".to_string();
        assert!(matches!(req.validate(), Err(LedgerError::Validation(_))));

        req.shop = "Direct Deli".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_amounts_beyond_ledger_range() {
        let over = Money::ledger_max().amount() + dec!(0.001);
        assert!(matches!(request(over, &[over]).validate(), Err(LedgerError::Validation(_))));

        let max = Money::ledger_max().amount();
        assert!(request(max, &[max]).validate().is_ok());
        assert!(matches!(
            request(dec!(10), &[dec!(10), over]).validate(),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_prepare_skips_zero_shares() {
        let prepared = request(dec!(10), &[dec!(10), dec!(0)]).prepare().unwrap();

        assert_eq!(prepared.entries.len(), 2);
        assert!(prepared.entries[0].amount.is_positive());
        assert!(prepared.entries.iter().all(|e| e.settlement_id == Some(prepared.settlement_id)));
        // the zero-share contributor is still checked for existence
        assert_eq!(prepared.participants.len(), 3);
    }

    #[test]
    fn test_fingerprint_tracks_payload() {
        let a = request(dec!(10), &[dec!(10)]);
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.total = Money::new(dec!(10.001));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_idempotency_key_parsing() {
        assert!(IdempotencyKey::parse("  ").is_err());
        assert!(IdempotencyKey::parse(&"k".repeat(129)).is_err());
        assert_eq!(IdempotencyKey::parse(" abc ").unwrap().as_str(), "abc");
    }
}
