//! Bill DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Money;
use domain_ledger::{
    apply_tax, BalanceDiscrepancy, BillDraft, BillView, IdempotencyKey, LedgerError, Participant,
    SettlementReceipt, SettlementRequest,
};

/// A contributor's base share; a missing amount means "nothing owed"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRequest {
    pub account_id: Uuid,
    pub amount: Option<Money>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SettleBillRequest {
    pub payer_id: Uuid,
    /// The amount the payer actually paid. When `tax_percent` is set only the
    /// shares are taxed, so an explicit total must already include tax.
    /// Defaults to the sum of the taxed shares.
    pub total: Option<Money>,
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub shop: String,
    #[validate(length(min = 1, message = "at least one contribution is required"))]
    pub contributions: Vec<ContributionRequest>,
    /// Surcharge applied to every share before settling
    pub tax_percent: Option<Decimal>,
}

impl SettleBillRequest {
    pub fn into_settlement(self, idempotency_key: IdempotencyKey) -> Result<SettlementRequest, LedgerError> {
        let mut draft = self
            .contributions
            .into_iter()
            .fold(BillDraft::new(self.payer_id.into(), self.date, self.shop), |draft, c| {
                draft.contribute(c.account_id.into(), c.amount)
            });
        if let Some(rate) = self.tax_percent {
            draft.apply_tax(rate)?;
        }
        draft.into_request(self.total, idempotency_key)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub settlement_id: Uuid,
    pub entry_ids: Vec<Uuid>,
    pub replayed: bool,
}

impl From<SettlementReceipt> for SettlementResponse {
    fn from(receipt: SettlementReceipt) -> Self {
        Self {
            settlement_id: receipt.settlement_id.into(),
            entry_ids: receipt.entry_ids.into_iter().map(Into::into).collect(),
            replayed: receipt.replayed,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TaxPreviewRequest {
    pub tax_percent: Decimal,
    #[validate(length(min = 1, message = "at least one contribution is required"))]
    pub contributions: Vec<ContributionRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaxPreviewResponse {
    pub tax_percent: Decimal,
    pub contributions: Vec<ContributionRequest>,
    pub total: Money,
}

impl TaxPreviewRequest {
    pub fn preview(self) -> Result<TaxPreviewResponse, LedgerError> {
        let taxed = apply_tax(
            self.contributions.into_iter().map(|c| (c.account_id, c.amount)),
            self.tax_percent,
        )?;
        let total = Money::checked_sum(taxed.iter().filter_map(|(_, amount)| amount.as_ref()))?;

        Ok(TaxPreviewResponse {
            tax_percent: self.tax_percent,
            contributions: taxed
                .into_iter()
                .map(|(account_id, amount)| ContributionRequest { account_id, amount })
                .collect(),
            total,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BillQuery {
    pub shop: String,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub account_id: Uuid,
    pub name: String,
    pub amount: Money,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            account_id: p.account_id.into(),
            name: p.name,
            amount: p.amount,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub settlement_id: Option<Uuid>,
    pub shop: String,
    pub date: NaiveDate,
    pub total_amount: Money,
    pub payer_id: Uuid,
    pub payer: String,
    pub payer_share: Option<Money>,
    pub participants: Vec<ParticipantResponse>,
}

impl From<BillView> for BillResponse {
    fn from(bill: BillView) -> Self {
        Self {
            settlement_id: bill.settlement_id.map(Into::into),
            shop: bill.shop,
            date: bill.date,
            total_amount: bill.total_amount,
            payer_id: bill.payer_id.into(),
            payer: bill.payer,
            payer_share: bill.payer_share,
            participants: bill.participants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscrepancyResponse {
    pub account_id: Uuid,
    pub recorded: Money,
    pub computed: Money,
}

impl From<BalanceDiscrepancy> for DiscrepancyResponse {
    fn from(d: BalanceDiscrepancy) -> Self {
        Self {
            account_id: d.account_id.into(),
            recorded: d.recorded,
            computed: d.computed,
        }
    }
}
