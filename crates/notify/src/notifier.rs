//! Notifier trait and its log and in-memory implementations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use booking_store::BookingRecord;
use tokio::sync::RwLock;

use crate::error::{NotifyError, Result};

/// Confirmation payload for one successful booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub ticket_count: u32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub conference_name: String,
}

impl Notification {
    pub fn new(
        ticket_count: u32,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        conference_name: impl Into<String>,
    ) -> Self {
        Self {
            ticket_count,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            conference_name: conference_name.into(),
        }
    }

    /// Builds the confirmation for a committed booking.
    pub fn for_booking(record: &BookingRecord) -> Self {
        Self::new(
            record.booking.number_of_tickets,
            record.booking.first_name.as_str(),
            record.booking.last_name.as_str(),
            record.booking.email.as_str(),
            record.conference_name.as_str(),
        )
    }

    /// Human-readable ticket line, e.g. `5 tickets for Ada Lovelace`.
    pub fn ticket_text(&self) -> String {
        format!(
            "{} tickets for {} {}",
            self.ticket_count, self.first_name, self.last_name
        )
    }
}

/// Delivers booking confirmations.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that writes each ticket to the log after an optional delay.
///
/// The delay stands in for a slow mail relay.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    delay: Duration,
}

impl LogNotifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        tracing::info!(
            email = %notification.email,
            conference = %notification.conference_name,
            ticket = %notification.ticket_text(),
            "sending ticket"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    delivered: Vec<Notification>,
    fail_on_deliver: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
    delay: Duration,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that takes `delay` to deliver each notification.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Configures the notifier to fail every delivery.
    pub async fn set_fail_on_deliver(&self, fail: bool) {
        self.state.write().await.fail_on_deliver = fail;
    }

    /// Returns the notifications delivered so far.
    pub async fn delivered(&self) -> Vec<Notification> {
        self.state.read().await.delivered.clone()
    }

    /// Returns the number of notifications delivered so far.
    pub async fn delivered_count(&self) -> usize {
        self.state.read().await.delivered.len()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut state = self.state.write().await;
        if state.fail_on_deliver {
            return Err(NotifyError::Delivery {
                email: notification.email.clone(),
                reason: "mailbox unavailable".to_string(),
            });
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}
