//! # Agent: the scheduler loop.
//!
//! The [`Agent`] owns the trigger handler (and through it the single sync slot), the
//! status reporter and the internal event bus. One task multiplexes everything:
//!
//! ```text
//! run(inbound):
//!   subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(Event)
//!   reporter.register()
//!
//!   loop (biased select, one branch per iteration):
//!     ├─ cancellation token / OS signal ─────────► exit
//!     ├─ heartbeat tick (every cfg.heartbeat) ──► reporter.heartbeat()
//!     ├─ inbound.recv() ───────────────────────► handler.handle(msg)
//!     │     └─ drain up to INBOUND_BATCH more with try_recv
//!     └─ poll tick (only while a sync is live) ─► handler.poll()
//!
//!   inbound closed: stop reading it; heartbeat and polling go on until cancelled
//!
//! Shutdown path:
//!   Bus.publish(ShutdownRequested{reason})
//!   handler.shutdown(cfg.grace):
//!     ├─ nothing live        → Ok
//!     ├─ killed + reaped     → ChildTerminated
//!     └─ not reaped in grace → GraceExceeded, RuntimeError::GraceExceeded
//!   listener drains the bus, SubscriberSet::shutdown()
//! ```
//!
//! No branch awaits the sync process itself, so heartbeats keep their cadence while
//! a transfer runs for minutes.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{config::AgentConfig, shutdown};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::reporter::StatusReporter;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::transport::InboundMessage;
use crate::trigger::TriggerHandler;

/// Upper bound of messages handled in one drain pass before timers get a turn.
const INBOUND_BATCH: usize = 64;

enum Exit {
    Cancelled,
    Signal(&'static str),
}

impl Exit {
    fn reason(&self) -> &'static str {
        match self {
            Exit::Cancelled => "cancelled",
            Exit::Signal(name) => name,
        }
    }
}

/// Remote-triggered sync agent.
///
/// Built with [`AgentBuilder`](crate::AgentBuilder); consumed by [`Agent::run`].
pub struct Agent {
    cfg: AgentConfig,
    events: Bus,
    reporter: StatusReporter,
    handler: TriggerHandler,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Agent {
    pub(crate) fn new_internal(
        cfg: AgentConfig,
        events: Bus,
        reporter: StatusReporter,
        handler: TriggerHandler,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            cfg,
            events,
            reporter,
            handler,
            subscribers,
        }
    }

    /// Configuration the agent was built from.
    pub fn config(&self) -> &AgentConfig {
        &self.cfg
    }

    /// Internal event bus; receivers see every lifecycle event published after subscribing.
    pub fn events(&self) -> Bus {
        self.events.clone()
    }

    /// Runs until SIGINT/SIGTERM/SIGQUIT (or Ctrl-C) arrives.
    ///
    /// A closed `inbound` channel does not end the run.
    pub async fn run(self, inbound: mpsc::Receiver<InboundMessage>) -> Result<(), RuntimeError> {
        self.drive(inbound, CancellationToken::new(), true).await
    }

    /// Runs until `token` is cancelled. OS signals are not handled.
    pub async fn run_until(
        self,
        inbound: mpsc::Receiver<InboundMessage>,
        token: CancellationToken,
    ) -> Result<(), RuntimeError> {
        self.drive(inbound, token, false).await
    }

    async fn drive(
        mut self,
        mut inbound: mpsc::Receiver<InboundMessage>,
        token: CancellationToken,
        os_signals: bool,
    ) -> Result<(), RuntimeError> {
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());

        info!(
            status_topic = %self.cfg.status_topic,
            trigger_topic = %self.cfg.trigger_topic,
            dir = %self.cfg.source_dir.display(),
            endpoint = ?self.cfg.bus_endpoint,
            "agent starting"
        );
        self.reporter.register().await;

        let signal = async {
            if os_signals {
                shutdown::wait_for_shutdown_signal().await
            } else {
                pending().await
            }
        };
        tokio::pin!(signal);

        let mut heartbeat = self.cfg.heartbeat().map(|period| {
            let mut i = time::interval_at(Instant::now() + period, period);
            i.set_missed_tick_behavior(MissedTickBehavior::Delay);
            i
        });
        let mut poll = time::interval(self.cfg.poll_interval_clamped());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inbound_open = true;

        let exit = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break Ok(Exit::Cancelled),
                res = &mut signal => break res.map(Exit::Signal),
                _ = tick(&mut heartbeat) => {
                    self.reporter.heartbeat().await;
                }
                msg = inbound.recv(), if inbound_open => match msg {
                    Some(msg) => {
                        self.handler.handle(&msg).await;
                        for _ in 0..INBOUND_BATCH {
                            let Ok(msg) = inbound.try_recv() else { break };
                            self.handler.handle(&msg).await;
                        }
                    }
                    None => {
                        warn!("inbound channel closed; no further triggers will be received");
                        inbound_open = false;
                    }
                },
                _ = poll.tick(), if self.handler.is_running() => {
                    self.handler.poll().await;
                }
            }
        };

        let reason = match &exit {
            Ok(exit) => exit.reason(),
            Err(e) => e.as_label(),
        };
        self.events
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        let reaped = self.handler.shutdown(self.cfg.grace).await;

        listener_stop.cancel();
        if let Err(e) = listener.await {
            warn!(err = %e, "subscriber listener ended abnormally");
        }
        info!(reason, "agent stopped");

        exit?;
        reaped
    }

    /// Forwards bus events to the subscriber set until `stop` fires, then drains the
    /// remaining backlog and closes the set.
    fn subscriber_listener(&mut self, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.events.subscribe();
        let set = SubscriberSet::new(std::mem::take(&mut self.subscribers), self.events.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        })
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(i) => {
            i.tick().await;
        }
        None => pending().await,
    }
}
