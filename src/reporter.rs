//! # Status reporter: the agent's only path to the remote controller.
//!
//! Status lines are JSON-encoded strings published on the status topic; heartbeats
//! and the registration announcement use the transport's dedicated calls.
//!
//! ## Rules
//! - **Never raises**: a failed publish is logged (`warn!`), published as
//!   `EventKind::PublishFailed` on the internal bus, and otherwise forgotten.
//! - **No persistence**: nothing is buffered for retry.
//! - Calls are awaited in order, so status lines reach the transport in the order
//!   they were reported.

use std::sync::Arc;

use tracing::warn;

use crate::error::BusError;
use crate::events::{Bus, Event, EventKind};
use crate::transport::MessageBus;

/// Default heartbeat payload.
pub const DEFAULT_HEARTBEAT_PAYLOAD: &str = "S3 Uploader Heartbeat";
/// Default registration payload.
pub const DEFAULT_REGISTRATION_PAYLOAD: &str = "S3 Uploader Registration";

/// Publishes status, heartbeat and registration messages.
#[derive(Clone)]
pub struct StatusReporter {
    bus: Arc<dyn MessageBus>,
    events: Bus,
    status_topic: Arc<str>,
    heartbeat_payload: Arc<str>,
    registration_payload: Arc<str>,
}

impl StatusReporter {
    pub fn new(bus: Arc<dyn MessageBus>, events: Bus, status_topic: impl Into<Arc<str>>) -> Self {
        Self {
            bus,
            events,
            status_topic: status_topic.into(),
            heartbeat_payload: DEFAULT_HEARTBEAT_PAYLOAD.into(),
            registration_payload: DEFAULT_REGISTRATION_PAYLOAD.into(),
        }
    }

    pub fn with_heartbeat_payload(mut self, payload: impl Into<Arc<str>>) -> Self {
        self.heartbeat_payload = payload.into();
        self
    }

    pub fn with_registration_payload(mut self, payload: impl Into<Arc<str>>) -> Self {
        self.registration_payload = payload.into();
        self
    }

    pub fn status_topic(&self) -> &str {
        &self.status_topic
    }

    /// Publishes a free-text status line. Returns whether the publish succeeded.
    pub async fn report(&self, text: &str) -> bool {
        let res = match serde_json::to_string(text) {
            Ok(payload) => self.bus.publish(&self.status_topic, &payload).await,
            Err(e) => Err(BusError::Encode(e)),
        };
        self.settle(res, Some(&*self.status_topic), None)
    }

    /// Publishes the fixed liveness payload.
    pub async fn heartbeat(&self) -> bool {
        let res = self.bus.publish_heartbeat(&self.heartbeat_payload).await;
        self.settle(res, None, Some(EventKind::HeartbeatSent))
    }

    /// Publishes the one-time registration announcement.
    pub async fn register(&self) -> bool {
        let res = self.bus.publish_registration(&self.registration_payload).await;
        self.settle(res, None, Some(EventKind::Registered))
    }

    fn settle(
        &self,
        res: Result<(), BusError>,
        topic: Option<&str>,
        on_ok: Option<EventKind>,
    ) -> bool {
        match res {
            Ok(()) => {
                if let Some(kind) = on_ok {
                    self.events.publish(Event::new(kind));
                }
                true
            }
            Err(e) => {
                warn!(err = %e, label = e.as_label(), "bus publish failed");
                let mut ev = Event::new(EventKind::PublishFailed).with_reason(e.to_string());
                if let Some(topic) = topic {
                    ev = ev.with_topic(topic);
                }
                self.events.publish(ev);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryBus, OutboundKind};

    fn reporter() -> (StatusReporter, MemoryBus, Bus) {
        let (mem, _tx, _rx) = MemoryBus::new(1);
        let events = Bus::new(16);
        let r = StatusReporter::new(Arc::new(mem.clone()), events.clone(), "uploader/status");
        (r, mem, events)
    }

    #[tokio::test]
    async fn status_is_json_string_on_status_topic() {
        let (r, mem, _events) = reporter();
        assert!(r.report("syncing dir: /data").await);

        let out = mem.outbound().await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, OutboundKind::Status);
        assert_eq!(out[0].topic.as_deref(), Some("uploader/status"));
        assert_eq!(out[0].payload, "\"syncing dir: /data\"");
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed_and_observable() {
        let (r, mem, events) = reporter();
        let mut rx = events.subscribe();
        mem.set_failing(true);

        assert!(!r.report("lost").await);
        assert!(!r.heartbeat().await);

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::PublishFailed);
        assert_eq!(ev.topic.as_deref(), Some("uploader/status"));
        assert!(mem.outbound().await.is_empty());
    }

    #[tokio::test]
    async fn heartbeat_and_registration_use_fixed_payloads() {
        let (r, mem, _events) = reporter();
        let r = r.with_heartbeat_payload("alive");
        assert!(r.register().await);
        assert!(r.heartbeat().await);

        let out = mem.outbound().await;
        assert_eq!(out[0].kind, OutboundKind::Registration);
        assert_eq!(out[0].payload, DEFAULT_REGISTRATION_PAYLOAD);
        assert_eq!(out[1].kind, OutboundKind::Heartbeat);
        assert_eq!(out[1].payload, "alive");
    }
}
