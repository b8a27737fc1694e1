use thiserror::Error;

use crate::ConferenceId;

/// Errors that can occur when interacting with the booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced conference does not exist.
    #[error("Conference not found: {0}")]
    ConferenceNotFound(ConferenceId),

    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A check constraint rejected the write.
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    /// The store could not be reached or timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The transaction could not be committed; none of its writes are visible.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// A persisted row could not be decoded into the model.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the failure is transient and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::CommitFailed(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) => {
                if db_err.is_unique_violation() {
                    return StoreError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    };
                }
                if db_err.is_check_violation() {
                    return StoreError::ConstraintViolation(db_err.message().to_string());
                }
                // serialization_failure / deadlock_detected
                if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
                    return StoreError::CommitFailed(db_err.message().to_string());
                }
                StoreError::Database(err)
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// Result type for booking store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn row_not_found_is_a_database_error() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_transient());
    }
}
