//! Delete-password capability check
//!
//! Soft-deleting an account is the one privileged operation. The caller proves
//! the capability by sending the shared password in the `X-Delete-Password`
//! header; handlers that need it take [`DeleteAuthorized`] as an extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

use crate::{error::ApiError, AppState};

/// Header carrying the delete password
pub const DELETE_PASSWORD_HEADER: &str = "x-delete-password";

/// Auth errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing X-Delete-Password header")]
    MissingPassword,
    #[error("Wrong delete password")]
    WrongPassword,
    #[error("Deleting accounts is disabled")]
    DeleteDisabled,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPassword => ApiError::BadRequest(err.to_string()),
            AuthError::WrongPassword | AuthError::DeleteDisabled => ApiError::Forbidden(err.to_string()),
        }
    }
}

/// Checks a presented password against the configured one
///
/// With no password configured every attempt is refused.
pub fn check_delete_password(presented: Option<&str>, configured: Option<&str>) -> Result<(), AuthError> {
    let configured = configured.ok_or(AuthError::DeleteDisabled)?;
    let presented = presented.ok_or(AuthError::MissingPassword)?;
    if passwords_match(presented.as_bytes(), configured.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::WrongPassword)
    }
}

fn passwords_match(presented: &[u8], configured: &[u8]) -> bool {
    // Length is not secret
    if presented.len() != configured.len() {
        return false;
    }
    presented.ct_eq(configured).into()
}

/// Proof that the request carried the correct delete password
#[derive(Debug, Clone, Copy)]
pub struct DeleteAuthorized;

#[async_trait]
impl FromRequestParts<AppState> for DeleteAuthorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(DELETE_PASSWORD_HEADER)
            .and_then(|h| h.to_str().ok());

        check_delete_password(presented, state.config.delete_password.as_deref()).map_err(|e| {
            warn!(uri = %parts.uri, error = %e, "Delete refused");
            ApiError::from(e)
        })?;
        Ok(DeleteAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_password() {
        assert_eq!(check_delete_password(Some("hunter2"), Some("hunter2")), Ok(()));
    }

    #[test]
    fn test_wrong_or_missing_password() {
        assert_eq!(
            check_delete_password(Some("hunter3"), Some("hunter2")),
            Err(AuthError::WrongPassword)
        );
        assert_eq!(
            check_delete_password(Some("hunter"), Some("hunter2")),
            Err(AuthError::WrongPassword)
        );
        assert_eq!(check_delete_password(None, Some("hunter2")), Err(AuthError::MissingPassword));
    }

    #[test]
    fn test_same_length_mismatch_is_refused() {
        assert!(passwords_match(b"hunter2", b"hunter2"));
        assert!(!passwords_match(b"hunter2", b"Hunter2"));
        assert!(!passwords_match(b"hunter2", b"hunter22"));
        assert!(!passwords_match(b"", b"hunter2"));
    }

    #[test]
    fn test_disabled_when_unconfigured() {
        assert_eq!(check_delete_password(Some("anything"), None), Err(AuthError::DeleteDisabled));
    }
}
