//! Booking error types.

use booking_store::StoreError;
use common::ConferenceId;
use thiserror::Error;

/// Request field rejected by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Tickets,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Name => write!(f, "name"),
            Field::Email => write!(f, "email"),
            Field::Tickets => write!(f, "number of tickets"),
        }
    }
}

/// Errors returned by booking operations.
///
/// Every failure of [`crate::ReservationCoordinator::book`] leaves the
/// conference and its bookings exactly as they were before the call.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A request field is malformed.
    #[error("Invalid {field}")]
    ValidationFailed { field: Field },

    /// Fewer tickets remain than were requested.
    #[error("Not enough tickets: requested {requested}, remaining {remaining}")]
    InsufficientTickets { requested: u32, remaining: u32 },

    /// The email already holds a booking under the active uniqueness scope.
    #[error("A booking already exists for {email}")]
    DuplicateBooking { email: String },

    /// The conference does not exist.
    #[error("Conference not found: {0}")]
    ConferenceNotFound(ConferenceId),

    /// The store could not be reached or did not answer in time.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The transaction failed to commit; nothing was recorded.
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),
}

impl BookingError {
    /// Short label used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::ValidationFailed { .. } => "validation_failed",
            BookingError::InsufficientTickets { .. } => "insufficient_tickets",
            BookingError::DuplicateBooking { .. } => "duplicate_booking",
            BookingError::ConferenceNotFound(_) => "conference_not_found",
            BookingError::StoreUnavailable(_) => "store_unavailable",
            BookingError::TransactionAborted(_) => "transaction_aborted",
        }
    }

    /// Returns true if the caller may retry the same request with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::StoreUnavailable(_) | BookingError::TransactionAborted(_)
        )
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConferenceNotFound(id) => BookingError::ConferenceNotFound(id),
            StoreError::CommitFailed(msg) => BookingError::TransactionAborted(msg),
            StoreError::UniqueViolation { .. } | StoreError::ConstraintViolation(_) => {
                BookingError::TransactionAborted(err.to_string())
            }
            StoreError::Unavailable(msg) => BookingError::StoreUnavailable(msg),
            StoreError::InvalidRow(_) | StoreError::Database(_) | StoreError::Migration(_) => {
                BookingError::StoreUnavailable(err.to_string())
            }
        }
    }
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
