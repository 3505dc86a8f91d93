//! # Trigger handler: the sync state machine.
//!
//! ```text
//!                     valid trigger, slot free
//!   ┌──────┐  ──────────────────────────────────────────►  ┌─────────┐
//!   │ Idle │      report "syncing dir: <dir>"               │ Running │
//!   │      │      report "<command line>"                   │ (pid)   │
//!   │      │      runner.start()                            │         │
//!   └──────┘  ◄──────────────────────────────────────────   └─────────┘
//!      ▲   │      poll(): outcome reaped                       │
//!      │   │      success → report stdout                      │ valid trigger:
//!      │   │      failure → report stderr                      │   Drop  → TriggerDropped
//!      │   │                                                   │   Queue → pending = true
//!      │   └── launch error → report failure, stay Idle        │
//!      └── malformed / unrecognized payload: nothing at all ◄──┘ (any state)
//! ```
//!
//! ## Rules
//! - Malformed or unrecognized payloads produce **no** status line and no transition;
//!   only a local `TriggerIgnored` event.
//! - "syncing dir" is always reported before the outcome of the same sync.
//! - No outcome is ever escalated: every path returns to `Idle`.
//! - With [`BusyPolicy::Queue`] the pending request starts right after the outcome
//!   of the live sync has been reported.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{RuntimeError, SyncError};
use crate::events::{Bus, Event, EventKind};
use crate::reporter::StatusReporter;
use crate::sync::{SyncOutcome, SyncRunner};
use crate::transport::InboundMessage;

use super::admission::BusyPolicy;
use super::message::{TriggerDecision, TriggerMessage};

/// Explicit handler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerState {
    /// No sync process is live.
    Idle,
    /// A sync process is live.
    Running {
        /// Pid reported by the OS at launch.
        pid: Option<u32>,
        /// When the process was launched.
        started_at: Instant,
    },
}

/// What happened to one inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Malformed, unrecognized or on a foreign topic.
    Ignored,
    /// A sync process was launched.
    Started { pid: Option<u32> },
    /// The sync process could not be launched; the handler stayed idle.
    LaunchFailed,
    /// A sync was live and the busy policy dropped the trigger.
    Dropped,
    /// A sync was live and the trigger is now pending.
    Queued,
}

/// Validates triggers and sequences the runner and the reporter.
pub struct TriggerHandler {
    runner: SyncRunner,
    reporter: StatusReporter,
    events: Bus,
    trigger_topic: Arc<str>,
    trigger_command: Arc<str>,
    policy: BusyPolicy,
    announce_command: bool,
    state: HandlerState,
    pending: bool,
}

impl TriggerHandler {
    pub fn new(
        runner: SyncRunner,
        reporter: StatusReporter,
        events: Bus,
        trigger_topic: impl Into<Arc<str>>,
        trigger_command: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            runner,
            reporter,
            events,
            trigger_topic: trigger_topic.into(),
            trigger_command: trigger_command.into(),
            policy: BusyPolicy::default(),
            announce_command: true,
            state: HandlerState::Idle,
            pending: false,
        }
    }

    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether the composed command line is reported after "syncing dir".
    pub fn with_command_announcement(mut self, enabled: bool) -> Self {
        self.announce_command = enabled;
        self
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, HandlerState::Running { .. })
    }

    /// Whether a queued trigger waits for the live sync to finish.
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Handles one inbound message.
    pub async fn handle(&mut self, msg: &InboundMessage) -> Dispatch {
        if msg.topic != *self.trigger_topic {
            self.events.publish(
                Event::new(EventKind::TriggerIgnored)
                    .with_topic(msg.topic.as_str())
                    .with_reason("not the trigger topic"),
            );
            return Dispatch::Ignored;
        }
        self.events
            .publish(Event::new(EventKind::TriggerReceived).with_topic(msg.topic.as_str()));

        if let TriggerDecision::Ignore(reason) =
            TriggerMessage::classify(&msg.payload, &self.trigger_command)
        {
            self.events.publish(
                Event::new(EventKind::TriggerIgnored)
                    .with_topic(msg.topic.as_str())
                    .with_reason(reason),
            );
            return Dispatch::Ignored;
        }

        if let HandlerState::Running { pid, .. } = self.state {
            let mut ev = match self.policy {
                BusyPolicy::Drop => Event::new(EventKind::TriggerDropped),
                BusyPolicy::Queue => {
                    self.pending = true;
                    Event::new(EventKind::TriggerQueued)
                }
            };
            if let Some(pid) = pid {
                ev = ev.with_pid(pid);
            }
            self.events.publish(ev);
            return match self.policy {
                BusyPolicy::Drop => Dispatch::Dropped,
                BusyPolicy::Queue => Dispatch::Queued,
            };
        }

        self.begin().await
    }

    /// Non-blocking completion check; reports the outcome when the live sync ended.
    ///
    /// Returns `true` if a sync finished during this call.
    pub async fn poll(&mut self) -> bool {
        let Some(res) = self.runner.poll() else {
            return false;
        };
        self.finish(res).await;
        if self.pending {
            self.pending = false;
            self.begin().await;
        }
        true
    }

    /// Kills the live sync (if any) and reaps it within `grace`.
    ///
    /// A pending trigger is discarded.
    pub async fn shutdown(&mut self, grace: Duration) -> Result<(), RuntimeError> {
        self.pending = false;
        let res = self.runner.terminate(grace).await;
        self.state = HandlerState::Idle;
        match res {
            Ok(None) => Ok(()),
            Ok(Some(pid)) => {
                self.events
                    .publish(Event::new(EventKind::ChildTerminated).with_pid(pid));
                Ok(())
            }
            Err(e) => {
                let mut ev = Event::new(EventKind::GraceExceeded);
                if let RuntimeError::GraceExceeded { pid: Some(pid), .. } = &e {
                    ev = ev.with_pid(*pid);
                }
                self.events.publish(ev);
                Err(e)
            }
        }
    }

    async fn begin(&mut self) -> Dispatch {
        let spec = self.runner.spec();
        let dir = spec.source_dir().display().to_string();
        let cmd = spec.display_command();

        self.events.publish(
            Event::new(EventKind::SyncStarting)
                .with_dir(dir.as_str())
                .with_reason(cmd.as_str()),
        );
        self.reporter.report(&format!("syncing dir: {dir}")).await;
        if self.announce_command {
            self.reporter.report(&cmd).await;
        }

        match self.runner.start() {
            Ok(pid) => {
                self.state = HandlerState::Running {
                    pid,
                    started_at: Instant::now(),
                };
                let mut ev = Event::new(EventKind::SyncStarted).with_dir(dir);
                if let Some(pid) = pid {
                    ev = ev.with_pid(pid);
                }
                self.events.publish(ev);
                Dispatch::Started { pid }
            }
            Err(e) => {
                self.events.publish(
                    Event::new(EventKind::LaunchFailed)
                        .with_dir(dir)
                        .with_reason(e.to_string()),
                );
                self.reporter
                    .report(&format!("sync failed to start: {}", e.as_message()))
                    .await;
                Dispatch::LaunchFailed
            }
        }
    }

    async fn finish(&mut self, res: Result<SyncOutcome, SyncError>) {
        self.state = HandlerState::Idle;
        let dir = self.runner.spec().source_dir().display().to_string();

        match res {
            Ok(outcome) => {
                let kind = if outcome.success {
                    EventKind::SyncSucceeded
                } else {
                    EventKind::SyncFailed
                };
                let mut ev = Event::new(kind)
                    .with_dir(dir)
                    .with_exit_code(outcome.exit_code)
                    .with_elapsed(outcome.elapsed);
                if let Some(pid) = outcome.pid {
                    ev = ev.with_pid(pid);
                }
                self.events.publish(ev);
                self.reporter.report(&outcome.report_text()).await;
            }
            Err(e) => {
                self.events.publish(
                    Event::new(EventKind::SyncFailed)
                        .with_dir(dir)
                        .with_reason(e.to_string()),
                );
                self.reporter
                    .report(&format!("sync failed: {}", e.as_message()))
                    .await;
            }
        }
    }
}
