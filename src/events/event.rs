//! # Internal events emitted by the scheduler, trigger handler and status reporter.
//!
//! These events are **local diagnostics**: they never leave the process on their own.
//! They are broadcast on the internal [`Bus`](super::Bus) and fanned out to
//! [`Subscribe`](crate::subscribers::Subscribe) implementations (e.g. the `LogWriter`).
//! What goes to the remote controller is decided by the status reporter, not by this module.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Trigger events**: what happened to an inbound message (received, ignored, dropped, queued)
//! - **Sync events**: external process lifecycle (starting, started, succeeded, failed)
//! - **Bus events**: outbound publishing (heartbeat sent, registration, publish failure)
//! - **Shutdown events**: termination signal and child reaping
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use syncvisor::events::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SyncFailed)
//!     .with_dir("/data")
//!     .with_pid(42)
//!     .with_exit_code(Some(1));
//!
//! assert_eq!(ev.kind, EventKind::SyncFailed);
//! assert_eq!(ev.dir.as_deref(), Some("/data"));
//! assert_eq!(ev.exit_code, Some(1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of internal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `subscriber`, `reason` ("full" / "closed")
    SubscriberOverflow,

    // === Trigger events ===
    /// A message arrived on the trigger topic.
    ///
    /// Sets: `topic`
    TriggerReceived,

    /// Trigger payload was malformed or carried an unrecognized command.
    ///
    /// Sets: `topic`, `reason`
    TriggerIgnored,

    /// Valid trigger arrived while a sync was live and the busy policy dropped it.
    ///
    /// Sets: `pid` of the live process
    TriggerDropped,

    /// Valid trigger arrived while a sync was live and was kept as the pending request.
    ///
    /// Sets: `pid` of the live process
    TriggerQueued,

    // === Sync events ===
    /// Trigger accepted; the process is about to be launched.
    ///
    /// Sets: `dir`, `reason` (composed command line)
    SyncStarting,

    /// Process launched.
    ///
    /// Sets: `dir`, `pid`
    SyncStarted,

    /// Process exited with code 0.
    ///
    /// Sets: `dir`, `pid`, `exit_code`, `elapsed_ms`
    SyncSucceeded,

    /// Process exited with a nonzero code or was killed by a signal.
    ///
    /// Sets: `dir`, `pid`, `exit_code` (absent when killed), `elapsed_ms`
    SyncFailed,

    /// Process could not be launched or reaped.
    ///
    /// Sets: `dir`, `reason`
    LaunchFailed,

    // === Bus events ===
    /// Registration announcement published.
    Registered,

    /// Heartbeat published.
    HeartbeatSent,

    /// Outbound publish failed and was swallowed.
    ///
    /// Sets: `topic`, `reason`
    PublishFailed,

    // === Shutdown events ===
    /// Termination signal (or explicit cancellation) observed.
    ShutdownRequested,

    /// Live child process was killed and reaped during shutdown.
    ///
    /// Sets: `pid`
    ChildTerminated,

    /// Live child process could not be reaped within the grace period.
    ///
    /// Sets: `pid`
    GraceExceeded,
}

/// Internal event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Source directory of the sync, if applicable.
    pub dir: Option<Arc<str>>,
    /// Bus topic, if applicable.
    pub topic: Option<Arc<str>>,
    /// Pid of the sync process, if applicable.
    pub pid: Option<u32>,
    /// Exit code of the sync process, if it exited normally.
    pub exit_code: Option<i32>,
    /// Wall time of the sync process in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, command line, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Subscriber name for overflow/panic events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            dir: None,
            topic: None,
            pid: None,
            exit_code: None,
            elapsed_ms: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the source directory.
    #[inline]
    pub fn with_dir(mut self, dir: impl Into<Arc<str>>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Attaches a bus topic.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Attaches the process wall time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::HeartbeatSent);
        let b = Event::new(EventKind::HeartbeatSent);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn elapsed_saturates() {
        let ev = Event::new(EventKind::SyncSucceeded).with_elapsed(Duration::from_secs(u64::MAX));
        assert_eq!(ev.elapsed_ms, Some(u32::MAX));
    }

    #[test]
    fn overflow_event_carries_subscriber() {
        let ev = Event::subscriber_overflow("log", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.subscriber, Some("log"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=log reason=full"));
    }
}
