//! Database error types
//!
//! Errors raised by the PostgreSQL layer and their translation into
//! [`LedgerError`], which is what the domain and API layers understand.

use thiserror::Error;

use domain_ledger::LedgerError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation or a value outside its column's range
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Serialization failure or deadlock; the transaction may be retried
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped to a domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// Checks if the failed transaction can be attempted again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::TransactionConflict(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps SQLx errors to DatabaseError variants by PostgreSQL error code
///
/// <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    // serialization failure, deadlock, lock_timeout expiry
                    Some("40001") | Some("40P01") | Some("55P03") => DatabaseError::TransactionConflict(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    // check violation, numeric field overflow
                    Some("23514") | Some("22003") => DatabaseError::ConstraintViolation(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::CorruptRow(error.to_string())
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

impl From<DatabaseError> for LedgerError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ConstraintViolation(msg) => LedgerError::Validation(msg),
            e if e.is_transient() => LedgerError::transient_storage(e.to_string()),
            e => LedgerError::storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DatabaseError::TransactionConflict("40001".into()).is_transient());
        assert!(DatabaseError::PoolExhausted.is_transient());
        assert!(!DatabaseError::QueryFailed("syntax".into()).is_transient());
    }

    #[test]
    fn test_ledger_error_translation() {
        let err: LedgerError = DatabaseError::TransactionConflict("deadlock detected".into()).into();
        assert!(err.is_transient());

        let err: LedgerError = DatabaseError::QueryFailed("boom".into()).into();
        assert!(matches!(err, LedgerError::Storage { transient: false, .. }));

        let err: LedgerError = DatabaseError::ConstraintViolation("label".into()).into();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err: LedgerError = DatabaseError::ConstraintViolation("numeric field overflow".into()).into();
        assert_eq!(err.kind(), domain_ledger::ErrorKind::Validation);
    }

    #[test]
    fn test_pool_timeout_maps_to_exhausted() {
        assert!(matches!(DatabaseError::from(sqlx::Error::PoolTimedOut), DatabaseError::PoolExhausted));
    }
}
