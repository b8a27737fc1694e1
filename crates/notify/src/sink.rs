//! Bounded notification queue with worker tasks and a drain barrier.

use std::sync::{Arc, RwLock};

use futures_util::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::notifier::{Notification, Notifier};

/// Sizing of a [`NotificationSink`].
#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<Notification>>>;

/// Fire-and-forget dispatcher for booking confirmations.
///
/// `notify` only enqueues: when the queue is full or already drained the
/// notification is dropped with a warning. Workers deliver in parallel with
/// no ordering guarantee.
pub struct NotificationSink {
    sender: RwLock<Option<mpsc::Sender<Notification>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationSink {
    /// Starts the worker tasks on the current tokio runtime.
    pub fn spawn<N: Notifier + 'static>(notifier: Arc<N>, config: SinkConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver: SharedReceiver = Arc::new(Mutex::new(receiver));

        let workers = (0..config.workers.max(1))
            .map(|worker| tokio::spawn(run_worker(worker, notifier.clone(), receiver.clone())))
            .collect();

        Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues a notification without waiting for delivery.
    ///
    /// Returns false if the notification was dropped.
    pub fn notify(&self, notification: Notification) -> bool {
        let sender = self
            .sender
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(sender) = sender.as_ref() else {
            tracing::warn!(email = %notification.email, "notification sink drained, dropping");
            metrics::counter!("notifications_dropped_total").increment(1);
            return false;
        };

        match sender.try_send(notification) {
            Ok(()) => {
                metrics::counter!("notifications_dispatched_total").increment(1);
                true
            }
            Err(e) => {
                let notification = match e {
                    mpsc::error::TrySendError::Full(n) | mpsc::error::TrySendError::Closed(n) => n,
                };
                tracing::warn!(email = %notification.email, "notification queue full, dropping");
                metrics::counter!("notifications_dropped_total").increment(1);
                false
            }
        }
    }

    /// Stops accepting notifications and waits until every queued one has
    /// been handed to the notifier.
    pub async fn drain(&self) {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for result in join_all(workers).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "notification worker failed");
            }
        }
        tracing::info!("notification sink drained");
    }
}

async fn run_worker<N: Notifier>(worker: usize, notifier: Arc<N>, receiver: SharedReceiver) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(notification) = next else {
            break;
        };

        match notifier.deliver(&notification).await {
            Ok(()) => {
                tracing::debug!(worker, email = %notification.email, "notification delivered");
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(worker, error = %e, "notification delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::InMemoryNotifier;

    fn notification(n: usize) -> Notification {
        Notification::new(1, "Ada", "Lovelace", format!("user{n}@x.com"), "Go Conference")
    }

    #[tokio::test]
    async fn drain_waits_for_queued_notifications() {
        let notifier = Arc::new(InMemoryNotifier::with_delay(Duration::from_millis(5)));
        let sink = NotificationSink::spawn(notifier.clone(), SinkConfig::default());

        for n in 0..10 {
            assert!(sink.notify(notification(n)));
        }
        sink.drain().await;

        assert_eq!(notifier.delivered_count().await, 10);
    }

    #[tokio::test]
    async fn notify_after_drain_is_dropped() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let sink = NotificationSink::spawn(notifier.clone(), SinkConfig::default());
        sink.drain().await;

        assert!(!sink.notify(notification(0)));
        assert_eq!(notifier.delivered_count().await, 0);
    }

    #[tokio::test]
    async fn drain_is_idempotent() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let sink = NotificationSink::spawn(notifier, SinkConfig::default());
        sink.drain().await;
        sink.drain().await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_instead_of_blocking() {
        let notifier = Arc::new(InMemoryNotifier::with_delay(Duration::from_secs(60)));
        let sink = NotificationSink::spawn(
            notifier.clone(),
            SinkConfig {
                workers: 1,
                queue_capacity: 1,
            },
        );

        let accepted = (0..5).filter(|n| sink.notify(notification(*n))).count();
        assert!(accepted < 5);

        sink.drain().await;
        assert_eq!(notifier.delivered_count().await, accepted);
    }

    #[tokio::test]
    async fn delivery_failures_are_swallowed() {
        let notifier = Arc::new(InMemoryNotifier::new());
        notifier.set_fail_on_deliver(true).await;
        let sink = NotificationSink::spawn(notifier.clone(), SinkConfig::default());

        assert!(sink.notify(notification(0)));
        sink.drain().await;

        assert_eq!(notifier.delivered_count().await, 0);
    }
}
