//! In-process bus for tests and single-process runs.
//!
//! Subscriptions are bounded mpsc channels behind a shared registry. A full
//! queue drops the message on lossy subjects (`missile.position` is
//! republished next tick anyway) and awaits room on reliable subjects, so a
//! slow subscriber backpressures the publisher instead of losing orders.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use rampart_core::subjects;

use crate::error::BusError;
use crate::traits::{BusMessage, EventBus, Subscription, SUBSCRIPTION_QUEUE_DEPTH};

#[derive(Clone, Default)]
pub struct InProcessBus {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<Vec<SubscriberEntry>>,
}

struct SubscriberEntry {
    pattern: String,
    tx: mpsc::Sender<BusMessage>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions (closed ones are pruned on publish).
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

#[async_trait]
impl EventBus for InProcessBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        // Snapshot matching senders so the registry lock is not held across
        // await points.
        let targets: Vec<mpsc::Sender<BusMessage>> = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.retain(|entry| !entry.tx.is_closed());
            subscribers
                .iter()
                .filter(|entry| subjects::subject_matches(&entry.pattern, subject))
                .map(|entry| entry.tx.clone())
                .collect()
        };

        let lossy = subjects::is_lossy(subject);
        for tx in targets {
            let message = BusMessage {
                subject: subject.to_string(),
                payload: payload.clone(),
            };
            if lossy {
                if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(message) {
                    warn!(subject, "subscriber lagging, dropping lossy message");
                }
            } else {
                // Receiver may have been dropped between snapshot and send.
                let _ = tx.send(message).await;
            }
        }
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE_DEPTH);
        self.inner.subscribers.lock().push(SubscriberEntry {
            pattern: pattern.to_string(),
            tx,
        });
        Ok(Subscription::new(rx))
    }
}
