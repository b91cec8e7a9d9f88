//! Ledger domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{AccountId, Money, MoneyError, SettlementId};

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Account name is empty or otherwise unusable
    #[error("Invalid account name: {0}")]
    InvalidName(String),

    /// Tax rate is negative or not a finite number
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// A bill draft was taxed twice
    #[error("Tax has already been applied to this bill draft")]
    TaxAlreadyApplied,

    /// Account does not exist or has been soft-deleted
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No entries match the (shop, date) key
    #[error("No bill found for shop '{shop}' on {date}")]
    BillNotFound { shop: String, date: NaiveDate },

    /// No entries carry the settlement id
    #[error("Settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// Contribution shares do not add up to the bill total
    #[error("Unbalanced settlement: total={total}, shares={shares}")]
    UnbalancedSettlement { total: Money, shares: Money },

    /// More than one payer credit matched a (shop, date) key
    #[error("Ambiguous bill for shop '{shop}' on {date}: {payers} payer entries")]
    AmbiguousBill {
        shop: String,
        date: NaiveDate,
        payers: usize,
    },

    /// The idempotency key was already used with a different payload
    #[error("Idempotency key '{0}' was already used for a different settlement")]
    IdempotencyConflict(String),

    /// Transaction or commit failure in the backing store
    #[error("Storage error: {message}")]
    Storage { message: String, transient: bool },
}

/// Coarse classification of [`LedgerError`] used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Consistency,
    Conflict,
    Storage,
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    /// A storage failure that must not be retried
    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
            transient: false,
        }
    }

    /// A storage failure that may succeed on a fresh attempt
    pub fn transient_storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
            transient: true,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_)
            | LedgerError::InvalidName(_)
            | LedgerError::InvalidRate(_)
            | LedgerError::TaxAlreadyApplied => ErrorKind::Validation,
            LedgerError::AccountNotFound(_)
            | LedgerError::BillNotFound { .. }
            | LedgerError::SettlementNotFound(_) => ErrorKind::NotFound,
            LedgerError::UnbalancedSettlement { .. } | LedgerError::AmbiguousBill { .. } => {
                ErrorKind::Consistency
            }
            LedgerError::IdempotencyConflict(_) => ErrorKind::Conflict,
            LedgerError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Returns true if the failed operation may be attempted again unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage { transient: true, .. })
    }
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::InvalidRate(msg) => LedgerError::InvalidRate(msg),
            MoneyError::InvalidAmount(msg) => LedgerError::Validation(msg),
            MoneyError::Overflow => LedgerError::Validation("amount out of range".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(LedgerError::TaxAlreadyApplied.kind(), ErrorKind::Validation);
        assert_eq!(LedgerError::AccountNotFound(AccountId::new()).kind(), ErrorKind::NotFound);
        assert_eq!(
            LedgerError::UnbalancedSettlement { total: Money::zero(), shares: Money::zero() }.kind(),
            ErrorKind::Consistency
        );
        assert_eq!(LedgerError::IdempotencyConflict("k".into()).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_only_transient_storage_is_retryable() {
        assert!(LedgerError::transient_storage("deadlock").is_transient());
        assert!(!LedgerError::storage("disk full").is_transient());
        assert!(!LedgerError::validation("bad").is_transient());
    }

    #[test]
    fn test_money_error_mapping() {
        let err: LedgerError = MoneyError::InvalidRate("nan".into()).into();
        assert!(matches!(err, LedgerError::InvalidRate(_)));
    }
}
