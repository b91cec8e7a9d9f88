//! Bill reconstruction
//!
//! Rebuilds the payer/participant view of a bill from raw entries. Entries
//! written by a settlement carry its id, so lookup by id is exact. Lookup by
//! (shop, date) is inference: it only works when exactly one payer credit
//! matches, and reports every other shape as ambiguous.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use core_kernel::{AccountId, Money, SettlementId};
use crate::entry::{LedgerEntry, DIRECT_ENTRY_LABEL};
use crate::error::LedgerError;

/// An entry joined with its owner's current display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedEntry {
    pub entry: LedgerEntry,
    pub account_name: String,
}

/// A contributor in a reconstructed bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub account_id: AccountId,
    pub name: String,
    pub amount: Money,
}

/// A reconstructed bill
///
/// The payer's own debit, if any, is reported as `payer_share` and is not
/// listed among `participants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillView {
    pub settlement_id: Option<SettlementId>,
    pub shop: String,
    pub date: NaiveDate,
    pub total_amount: Money,
    pub payer_id: AccountId,
    pub payer: String,
    pub payer_share: Option<Money>,
    pub participants: Vec<Participant>,
}

/// Reconstructs the bill identified by shop label and date
///
/// # Errors
///
/// - `BillNotFound` if no entry matches, or if `shop` is the direct-entry
///   sentinel, which never names a bill
/// - `AmbiguousBill` if the matches do not contain exactly one payer credit
pub fn reconstruct_bill(shop: &str, date: NaiveDate, rows: &[JoinedEntry]) -> Result<BillView, LedgerError> {
    let matched: Vec<&JoinedEntry> = rows
        .iter()
        .filter(|r| r.entry.label == shop && r.entry.date == date)
        .collect();
    if matched.is_empty() || shop.trim() == DIRECT_ENTRY_LABEL {
        return Err(LedgerError::BillNotFound {
            shop: shop.to_string(),
            date,
        });
    }

    let payers = matched.iter().filter(|r| r.entry.is_credit()).count();
    if payers != 1 {
        warn!(shop, %date, payers, "Cannot attribute bill to a single payer");
        return Err(LedgerError::AmbiguousBill {
            shop: shop.to_string(),
            date,
            payers,
        });
    }

    let settlement_id = shared_settlement_id(&matched);
    assemble(settlement_id, shop, date, matched)
}

/// Reconstructs a bill by its settlement id
pub fn reconstruct_settlement(settlement_id: SettlementId, rows: &[JoinedEntry]) -> Result<BillView, LedgerError> {
    let matched: Vec<&JoinedEntry> = rows
        .iter()
        .filter(|r| r.entry.settlement_id == Some(settlement_id))
        .collect();
    let first = matched.first().ok_or(LedgerError::SettlementNotFound(settlement_id))?;
    let (shop, date) = (first.entry.label.clone(), first.entry.date);

    let payers = matched.iter().filter(|r| r.entry.is_credit()).count();
    if payers != 1 {
        return Err(LedgerError::AmbiguousBill { shop, date, payers });
    }
    assemble(Some(settlement_id), &shop, date, matched)
}

fn shared_settlement_id(rows: &[&JoinedEntry]) -> Option<SettlementId> {
    let first = rows.first()?.entry.settlement_id?;
    rows.iter()
        .all(|r| r.entry.settlement_id == Some(first))
        .then_some(first)
}

fn assemble(
    settlement_id: Option<SettlementId>,
    shop: &str,
    date: NaiveDate,
    mut rows: Vec<&JoinedEntry>,
) -> Result<BillView, LedgerError> {
    rows.sort_by_key(|r| r.entry.sequence);

    let payer = rows
        .iter()
        .find(|r| r.entry.is_credit())
        .ok_or_else(|| LedgerError::AmbiguousBill {
            shop: shop.to_string(),
            date,
            payers: 0,
        })?;
    let total_amount = Money::checked_sum(rows.iter().filter(|r| r.entry.is_credit()).map(|r| &r.entry.amount))?;

    let mut payer_share: Option<Money> = None;
    let mut participants = Vec::new();
    for row in rows.iter().filter(|r| r.entry.is_debit()) {
        let amount = row.entry.amount.abs();
        if row.entry.account_id == payer.entry.account_id {
            payer_share = Some(payer_share.unwrap_or_default().checked_add(&amount)?);
        } else {
            participants.push(Participant {
                account_id: row.entry.account_id,
                name: row.account_name.clone(),
                amount,
            });
        }
    }

    Ok(BillView {
        settlement_id,
        shop: shop.to_string(),
        date,
        total_amount,
        payer_id: payer.entry.account_id,
        payer: payer.account_name.clone(),
        payer_share,
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::EntryId;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn row(seq: i64, who: (AccountId, &str), amount: Decimal, settlement_id: Option<SettlementId>) -> JoinedEntry {
        JoinedEntry {
            entry: LedgerEntry {
                id: EntryId::new(),
                sequence: seq,
                account_id: who.0,
                date: date(),
                amount: Money::new(amount),
                label: "Cafe".to_string(),
                settlement_id,
            },
            account_name: who.1.to_string(),
        }
    }

    #[test]
    fn test_direct_entries_never_form_a_bill() {
        let ali = (AccountId::new(), "Ali");
        let sara = (AccountId::new(), "Sara");
        let rows: Vec<JoinedEntry> = [row(1, ali, dec!(5), None), row(2, sara, dec!(-3), None)]
            .into_iter()
            .map(|mut r| {
                r.entry.label = DIRECT_ENTRY_LABEL.to_string();
                r
            })
            .collect();

        assert!(matches!(
            reconstruct_bill(DIRECT_ENTRY_LABEL, date(), &rows),
            Err(LedgerError::BillNotFound { .. })
        ));
    }

    #[test]
    fn test_payer_self_share_is_separated() {
        let ali = (AccountId::new(), "Ali");
        let sara = (AccountId::new(), "Sara");
        let stl = Some(SettlementId::new());
        let rows = vec![
            row(3, sara, dec!(-4), stl),
            row(2, ali, dec!(-6), stl),
            row(1, ali, dec!(10), stl),
        ];

        let view = reconstruct_bill("Cafe", date(), &rows).unwrap();
        assert_eq!(view.payer, "Ali");
        assert_eq!(view.total_amount, Money::new(dec!(10)));
        assert_eq!(view.payer_share, Some(Money::new(dec!(6))));
        assert_eq!(view.participants.len(), 1);
        assert_eq!(view.participants[0].name, "Sara");
        assert_eq!(view.settlement_id, stl);
    }

    #[test]
    fn test_two_payers_is_ambiguous() {
        let ali = (AccountId::new(), "Ali");
        let sara = (AccountId::new(), "Sara");
        let rows = vec![
            row(1, ali, dec!(10), None),
            row(2, sara, dec!(-10), None),
            row(3, sara, dec!(8), None),
            row(4, ali, dec!(-8), None),
        ];

        assert!(matches!(
            reconstruct_bill("Cafe", date(), &rows),
            Err(LedgerError::AmbiguousBill { payers: 2, .. })
        ));
    }

    #[test]
    fn test_no_match_is_not_found() {
        assert!(matches!(
            reconstruct_bill("Cafe", date(), &[]),
            Err(LedgerError::BillNotFound { .. })
        ));
    }

    #[test]
    fn test_legacy_rows_have_no_settlement_id() {
        let ali = (AccountId::new(), "Ali");
        let sara = (AccountId::new(), "Sara");
        let rows = vec![row(1, ali, dec!(5), None), row(2, sara, dec!(-5), None)];

        let view = reconstruct_bill("Cafe", date(), &rows).unwrap();
        assert_eq!(view.settlement_id, None);
        assert_eq!(view.payer_share, None);
    }

    #[test]
    fn test_lookup_by_settlement_ignores_same_day_neighbours() {
        let ali = (AccountId::new(), "Ali");
        let sara = (AccountId::new(), "Sara");
        let first = SettlementId::new();
        let second = SettlementId::new();
        let rows = vec![
            row(1, ali, dec!(10), Some(first)),
            row(2, sara, dec!(-10), Some(first)),
            row(3, sara, dec!(8), Some(second)),
            row(4, ali, dec!(-8), Some(second)),
        ];

        let view = reconstruct_settlement(second, &rows).unwrap();
        assert_eq!(view.payer, "Sara");
        assert_eq!(view.total_amount, Money::new(dec!(8)));
        assert!(matches!(
            reconstruct_settlement(SettlementId::new(), &rows),
            Err(LedgerError::SettlementNotFound(_))
        ));
    }
}
