//! # LogWriter: renders internal events through `tracing`.
//!
//! Routine events (heartbeats, ignored triggers) go to `debug`, lifecycle
//! milestones to `info`, failures to `warn`/`error`. The process-wide filter
//! (`RUST_LOG`) decides what is actually printed.
//!
//! ## Example output
//! ```text
//! INFO syncvisor::log: sync starting dir="/data" cmd="aws s3 sync /data s3://bucket"
//! INFO syncvisor::log: sync started dir="/data" pid=4242
//! WARN syncvisor::log: sync failed dir="/data" pid=4242 exit_code=Some(1) elapsed_ms=Some(830)
//! WARN syncvisor::log: trigger dropped, sync already live pid=Some(4242)
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TriggerReceived => {
                debug!(target: "syncvisor::log", seq = e.seq, topic = ?e.topic, "trigger received");
            }
            EventKind::TriggerIgnored => {
                debug!(target: "syncvisor::log", topic = ?e.topic, reason = ?e.reason, "trigger ignored");
            }
            EventKind::TriggerDropped => {
                warn!(target: "syncvisor::log", pid = ?e.pid, "trigger dropped, sync already live");
            }
            EventKind::TriggerQueued => {
                info!(target: "syncvisor::log", pid = ?e.pid, "trigger queued behind live sync");
            }
            EventKind::SyncStarting => {
                info!(target: "syncvisor::log", dir = ?e.dir, cmd = ?e.reason, "sync starting");
            }
            EventKind::SyncStarted => {
                info!(target: "syncvisor::log", dir = ?e.dir, pid = ?e.pid, "sync started");
            }
            EventKind::SyncSucceeded => {
                info!(
                    target: "syncvisor::log",
                    dir = ?e.dir, pid = ?e.pid, elapsed_ms = ?e.elapsed_ms,
                    "sync succeeded"
                );
            }
            EventKind::SyncFailed => {
                warn!(
                    target: "syncvisor::log",
                    dir = ?e.dir, pid = ?e.pid, exit_code = ?e.exit_code, elapsed_ms = ?e.elapsed_ms,
                    "sync failed"
                );
            }
            EventKind::LaunchFailed => {
                error!(target: "syncvisor::log", dir = ?e.dir, err = ?e.reason, "sync launch failed");
            }
            EventKind::Registered => {
                info!(target: "syncvisor::log", "registration published");
            }
            EventKind::HeartbeatSent => {
                debug!(target: "syncvisor::log", seq = e.seq, "heartbeat");
            }
            EventKind::PublishFailed => {
                warn!(target: "syncvisor::log", topic = ?e.topic, err = ?e.reason, "publish failed");
            }
            EventKind::ShutdownRequested => {
                info!(target: "syncvisor::log", reason = ?e.reason, "shutdown requested");
            }
            EventKind::ChildTerminated => {
                info!(target: "syncvisor::log", pid = ?e.pid, "sync process terminated");
            }
            EventKind::GraceExceeded => {
                error!(target: "syncvisor::log", pid = ?e.pid, "sync process did not exit within grace");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "syncvisor::log", subscriber = ?e.subscriber, reason = ?e.reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(
                    target: "syncvisor::log",
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    info = e.reason.as_deref().unwrap_or("unknown"),
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}
