//! Test Data Builders
//!
//! Builders that let a test specify only the fields it cares about.

use chrono::NaiveDate;
use core_kernel::{AccountId, Money};
use domain_ledger::{Contribution, IdempotencyKey, SettlementRequest};
use uuid::Uuid;

use crate::fixtures::{DateFixtures, MoneyFixtures, StringFixtures};

/// Builder for settlement requests
///
/// Defaults to a 10.000 bill at the fixture shop on the fixture date, with no
/// contributions and a fresh idempotency key.
pub struct SettlementRequestBuilder {
    payer_id: AccountId,
    total: Money,
    date: NaiveDate,
    shop: String,
    contributions: Vec<Contribution>,
    key: String,
}

impl SettlementRequestBuilder {
    pub fn new(payer_id: AccountId) -> Self {
        Self {
            payer_id,
            total: MoneyFixtures::ten(),
            date: DateFixtures::new_year(),
            shop: StringFixtures::shop().to_string(),
            contributions: Vec::new(),
            key: Uuid::new_v4().to_string(),
        }
    }

    pub fn total(mut self, total: Money) -> Self {
        self.total = total;
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn shop(mut self, shop: impl Into<String>) -> Self {
        self.shop = shop.into();
        self
    }

    pub fn share(mut self, account_id: AccountId, share: Money) -> Self {
        self.contributions.push(Contribution { account_id, share });
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the total to the sum of the shares added so far
    pub fn balanced(mut self) -> Self {
        self.total = self.contributions.iter().map(|c| c.share).sum();
        self
    }

    /// # Panics
    ///
    /// Panics if the key is blank or too long.
    pub fn build(self) -> SettlementRequest {
        SettlementRequest {
            payer_id: self.payer_id,
            total: self.total,
            date: self.date,
            shop: self.shop,
            contributions: self.contributions,
            idempotency_key: IdempotencyKey::parse(&self.key).expect("valid idempotency key"),
        }
    }
}
