//! # Message bus seam.
//!
//! The remote publish/subscribe transport is an external collaborator. The agent only
//! needs three outbound operations ([`MessageBus`]) and a stream of inbound messages
//! (a `tokio::sync::mpsc::Receiver<InboundMessage>`). Connection setup, subscription,
//! reconnects and credentials stay inside the implementation.
//!
//! Shipped implementations:
//! - [`MemoryBus`]: in-process recorder (tests, embedding);
//! - `StdioBus`: JSON lines over stdin/stdout (feature `stdio`).

use async_trait::async_trait;

use crate::error::BusError;

mod memory;
mod message;
#[cfg(feature = "stdio")]
mod stdio;

pub use memory::MemoryBus;
pub use message::{InboundMessage, OutboundKind, OutboundMessage};
#[cfg(feature = "stdio")]
pub use stdio::StdioBus;

/// Outbound half of the remote message bus.
///
/// Implementations report failures; the agent decides to swallow them.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Publishes an already-encoded payload on `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;

    /// Publishes a liveness payload on the transport's heartbeat channel.
    async fn publish_heartbeat(&self, payload: &str) -> Result<(), BusError>;

    /// Publishes the one-time registration announcement.
    async fn publish_registration(&self, payload: &str) -> Result<(), BusError>;
}
