//! Asynchronous, best-effort booking confirmations.
//!
//! A [`NotificationSink`] owns a bounded queue drained by independent worker
//! tasks that hand each [`Notification`] to a [`Notifier`]. Enqueueing never
//! waits on delivery, and delivery failures never reach the booking path.
//! [`NotificationSink::drain`] waits for everything queued so far before
//! shutdown.

pub mod error;
pub mod notifier;
pub mod sink;

pub use error::{NotifyError, Result};
pub use notifier::{InMemoryNotifier, LogNotifier, Notification, Notifier};
pub use sink::{NotificationSink, SinkConfig};
