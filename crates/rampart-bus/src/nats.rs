//! NATS-backed bus for distributed deployments.
//!
//! Subjects and the trailing `>` wildcard map 1:1 onto NATS semantics, so
//! this is a thin adapter: each subscription gets a forwarding task that
//! moves NATS messages into the common [`Subscription`] channel.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::BusError;
use crate::traits::{BusMessage, EventBus, Subscription, SUBSCRIPTION_QUEUE_DEPTH};

#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to a NATS server.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        let mut subscriber =
            self.client
                .subscribe(pattern.to_string())
                .await
                .map_err(|e| BusError::Subscribe {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE_DEPTH);
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let forwarded = BusMessage {
                    subject: message.subject.to_string(),
                    payload: message.payload.to_vec(),
                };
                if tx.send(forwarded).await.is_err() {
                    break;
                }
            }
        });
        Ok(Subscription::new(rx))
    }
}
