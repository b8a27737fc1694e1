//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reservation::BookingError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Booking core error.
    Booking(BookingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Booking(err) => booking_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn booking_error_to_response(err: BookingError) -> (StatusCode, String) {
    let status = match &err {
        BookingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
        BookingError::ConferenceNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::InsufficientTickets { .. } | BookingError::DuplicateBooking { .. } => {
            StatusCode::CONFLICT
        }
        BookingError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::TransactionAborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, reason = err.reason(), "booking request failed");
    }
    (status, err.to_string())
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] booking_store::StoreError),

    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
