//! Notification error types.

use thiserror::Error;

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notifier could not deliver the message.
    #[error("Delivery to {email} failed: {reason}")]
    Delivery { email: String, reason: String },
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotifyError>;
