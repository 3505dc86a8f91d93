//! # Internal event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging local observers into the agent:
//! structured logging, counters, a watchdog that notices a sync taking too long, etc.
//!
//! Each subscriber gets its own worker task and bounded queue (see
//! [`SubscriberSet`](super::SubscriberSet)), so a slow or panicking subscriber can
//! never stall the scheduler loop or delay a heartbeat.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use syncvisor::events::{Event, EventKind};
//! use syncvisor::subscribers::Subscribe;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::SyncFailed | EventKind::LaunchFailed) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of internal agent events.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per subscriber.
    ///
    /// Panics are caught; the agent publishes `EventKind::SubscriberPanicked`.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (clamped to at least 1).
    ///
    /// Default: 256.
    fn queue_capacity(&self) -> usize {
        256
    }
}
