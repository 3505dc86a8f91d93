use std::sync::Arc;

use crate::{
    core::{AgentConfig, agent::Agent},
    events::Bus,
    reporter::StatusReporter,
    subscribers::Subscribe,
    sync::SyncRunner,
    transport::MessageBus,
    trigger::TriggerHandler,
};

/// Builder wiring an [`Agent`] from its configuration and a transport.
pub struct AgentBuilder {
    cfg: AgentConfig,
    bus: Arc<dyn MessageBus>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl AgentBuilder {
    /// Creates a new builder; `bus` carries status, heartbeat and registration messages.
    pub fn new(cfg: AgentConfig, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            cfg,
            bus,
            subscribers: Vec::new(),
        }
    }

    /// Sets internal event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events (triggers, sync outcomes, publish failures)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the agent. Nothing is spawned until [`Agent::run`].
    pub fn build(self) -> Agent {
        let cfg = self.cfg;
        let events = Bus::new(cfg.event_capacity_clamped());

        let reporter = StatusReporter::new(self.bus, events.clone(), cfg.status_topic.as_str())
            .with_heartbeat_payload(cfg.heartbeat_payload.as_str())
            .with_registration_payload(cfg.registration_payload.as_str());

        let runner = SyncRunner::new(Arc::new(cfg.sync_spec()));
        let handler = TriggerHandler::new(
            runner,
            reporter.clone(),
            events.clone(),
            cfg.trigger_topic.as_str(),
            cfg.trigger_command.as_str(),
        )
        .with_busy_policy(cfg.busy_policy)
        .with_command_announcement(cfg.announce_command);

        Agent::new_internal(cfg, events, reporter, handler, self.subscribers)
    }
}
