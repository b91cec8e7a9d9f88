//! Account DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Money;
use domain_ledger::Account;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameAccountRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
}

/// Deposit into an account; `label` defaults to the direct-entry label
#[derive(Debug, Deserialize, Validate)]
pub struct CreditRequest {
    pub amount: Money,
    pub date: NaiveDate,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub label: Option<String>,
}

/// Withdrawal from an account; `amount` is the positive magnitude
#[derive(Debug, Deserialize, Validate)]
pub struct DebitRequest {
    pub amount: Money,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub balance: Money,
    pub deleted: bool,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.into(),
            name: account.name,
            balance: account.balance,
            deleted: account.deleted,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAccountResponse {
    pub id: Uuid,
    /// False when the account had already been deleted
    pub deleted: bool,
}
