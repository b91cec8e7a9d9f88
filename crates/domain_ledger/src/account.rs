//! Accounts holding a running balance
//!
//! An account is never hard-deleted. Soft deletion renames it to
//! [`DELETED_ACCOUNT_NAME`] and flags it, so historical entries keep a valid
//! owner.

use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Money};
use crate::error::LedgerError;

/// Display name given to every soft-deleted account
pub const DELETED_ACCOUNT_NAME: &str = "[deleted]";

/// A named balance holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier
    pub id: AccountId,
    /// Display name (mutable)
    pub name: String,
    /// Sum of all entry amounts for this account
    pub balance: Money,
    /// Whether the account has been soft-deleted
    pub deleted: bool,
}

impl Account {
    /// Creates a new account with a zero balance
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the trimmed name is empty
    pub fn open(name: &str) -> Result<Self, LedgerError> {
        Ok(Self {
            id: AccountId::new(),
            name: validate_name(name)?,
            balance: Money::zero(),
            deleted: false,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Renames the account
    pub fn rename(&mut self, name: &str) -> Result<(), LedgerError> {
        self.name = validate_name(name)?;
        Ok(())
    }

    /// Marks the account deleted and replaces its name with the sentinel
    ///
    /// Returns false if the account was already deleted.
    pub fn soft_delete(&mut self) -> bool {
        if self.deleted {
            return false;
        }
        self.deleted = true;
        self.name = DELETED_ACCOUNT_NAME.to_string();
        true
    }
}

/// Trims a proposed display name and rejects empty ones
pub fn validate_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidName("name must not be empty".to_string()));
    }
    if trimmed == DELETED_ACCOUNT_NAME {
        return Err(LedgerError::InvalidName(format!(
            "'{}' is reserved for deleted accounts",
            DELETED_ACCOUNT_NAME
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_trims_name() {
        let account = Account::open("  Ali ").unwrap();
        assert_eq!(account.name, "Ali");
        assert!(account.balance.is_zero());
        assert!(account.is_active());
    }

    #[test]
    fn test_open_rejects_empty_and_reserved() {
        assert!(matches!(Account::open("   "), Err(LedgerError::InvalidName(_))));
        assert!(matches!(Account::open(DELETED_ACCOUNT_NAME), Err(LedgerError::InvalidName(_))));
    }

    #[test]
    fn test_soft_delete_is_idempotent() {
        let mut account = Account::open("Sara").unwrap();
        assert!(account.soft_delete());
        assert!(!account.soft_delete());
        assert_eq!(account.name, DELETED_ACCOUNT_NAME);
        assert!(!account.is_active());
    }
}
