//! # In-process message bus.
//!
//! [`MemoryBus`] records every outbound message and can be told to fail publishes.
//! Inbound messages are injected through the sender returned by [`MemoryBus::new`].
//! Used by tests and by embedders that bridge to their own broker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, mpsc};

use crate::error::BusError;

use super::message::{InboundMessage, OutboundKind, OutboundMessage};
use super::MessageBus;

#[derive(Default)]
struct Shared {
    outbound: Mutex<Vec<OutboundMessage>>,
    changed: Notify,
    failing: AtomicBool,
}

/// Recording bus; cheap to clone, clones share the same record.
#[derive(Clone, Default)]
pub struct MemoryBus {
    shared: Arc<Shared>,
}

impl MemoryBus {
    /// Creates a bus plus the inbound channel the agent reads from.
    pub fn new(
        inbound_capacity: usize,
    ) -> (Self, mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = mpsc::channel(inbound_capacity.max(1));
        (Self::default(), tx, rx)
    }

    /// Makes subsequent publishes fail with [`BusError::Publish`] (`true`) or succeed again.
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of everything published so far, in publish order.
    pub async fn outbound(&self) -> Vec<OutboundMessage> {
        self.shared.outbound.lock().await.clone()
    }

    /// Decoded status lines published so far.
    pub async fn status_lines(&self) -> Vec<String> {
        self.outbound()
            .await
            .iter()
            .filter(|m| m.kind == OutboundKind::Status)
            .filter_map(OutboundMessage::status_text)
            .collect()
    }

    /// Waits until `pred` holds for the recorded messages, or `timeout` elapses.
    ///
    /// Returns the final value of `pred`.
    pub async fn wait_until<F>(&self, timeout: Duration, mut pred: F) -> bool
    where
        F: FnMut(&[OutboundMessage]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let changed = self.shared.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if pred(&self.shared.outbound.lock().await) {
                return true;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return pred(&self.shared.outbound.lock().await);
            }
        }
    }

    async fn record(&self, msg: OutboundMessage) -> Result<(), BusError> {
        if self.shared.failing.load(Ordering::SeqCst) {
            return Err(BusError::Publish {
                topic: msg.topic.unwrap_or_default(),
                reason: "memory bus set to fail".into(),
            });
        }
        self.shared.outbound.lock().await.push(msg);
        self.shared.changed.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.record(OutboundMessage::new(OutboundKind::Status, Some(topic), payload))
            .await
    }

    async fn publish_heartbeat(&self, payload: &str) -> Result<(), BusError> {
        self.record(OutboundMessage::new(OutboundKind::Heartbeat, None, payload))
            .await
    }

    async fn publish_registration(&self, payload: &str) -> Result<(), BusError> {
        self.record(OutboundMessage::new(OutboundKind::Registration, None, payload))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_in_order_and_fails_on_demand() {
        let (bus, _tx, _rx) = MemoryBus::new(1);
        bus.publish("status", "\"one\"").await.expect("publish");
        bus.set_failing(true);
        assert!(matches!(
            bus.publish("status", "\"two\"").await,
            Err(BusError::Publish { .. })
        ));
        bus.set_failing(false);
        bus.publish_heartbeat("hb").await.expect("heartbeat");

        let out = bus.outbound().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].topic.as_deref(), Some("status"));
        assert_eq!(out[1].kind, OutboundKind::Heartbeat);
        assert_eq!(bus.status_lines().await, vec!["one".to_string()]);
    }

    #[tokio::test]
    async fn wait_until_wakes_on_publish() {
        let (bus, _tx, _rx) = MemoryBus::new(1);
        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish_registration("reg").await.expect("publish");
        });

        let seen = bus
            .wait_until(Duration::from_secs(2), |m| !m.is_empty())
            .await;
        assert!(seen);
    }
}
