//! The publish/subscribe contract.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::BusError;

/// Per-subscription queue depth before backpressure applies.
pub const SUBSCRIPTION_QUEUE_DEPTH: usize = 1024;

/// A message as delivered to a subscriber.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Decode the payload as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        serde_json::from_slice(&self.payload).map_err(|source| BusError::Decode {
            subject: self.subject.clone(),
            source,
        })
    }
}

/// A live subscription. Dropping it ends delivery.
pub struct Subscription {
    rx: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<BusMessage>) -> Self {
        Self { rx }
    }

    /// Wait for the next message. `None` once the bus side is gone.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }

    /// Take a message if one is already queued. Used by tick loops that
    /// drain their inbox at the tick boundary.
    pub fn try_next(&mut self) -> Option<BusMessage> {
        self.rx.try_recv().ok()
    }
}

/// Publish/subscribe transport with subject-based fan-out.
///
/// Ordering: one producer's messages on one subject are delivered to each
/// subscriber in publish order; nothing is guaranteed across subjects.
/// Delivery is at-most-once with no replay.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Best-effort delivery to all current subscribers.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Receive every message on subjects matching `pattern` (exact or
    /// trailing `>` wildcard) while the subscription is live.
    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError>;
}

/// JSON convenience over [`EventBus`].
#[async_trait]
pub trait EventBusExt: EventBus {
    async fn publish_json<T: Serialize + Sync>(
        &self,
        subject: &str,
        value: &T,
    ) -> Result<(), BusError> {
        let payload = serde_json::to_vec(value)?;
        self.publish(subject, payload).await
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}
