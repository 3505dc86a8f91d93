use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use syncvisor::{
    AgentBuilder, AgentConfig, BusyPolicy, Event, EventKind, InboundMessage, MemoryBus,
    OutboundKind, OutboundMessage, RuntimeError, SyncCommand,
};

const STATUS: &str = "uploader/status";
const C2: &str = "c2/sync";
const WAIT: Duration = Duration::from_secs(5);

fn config(dir: &Path, script: &str) -> AgentConfig {
    let mut cfg = AgentConfig::new(STATUS, C2, dir, "my-bucket");
    // `sync` becomes $0, so source and destination land in $1 and $2
    cfg.sync_command = SyncCommand::new("sh").with_base_args(["-c", script, "sync"]);
    cfg.poll_interval = Duration::from_millis(10);
    cfg.grace = Duration::from_secs(2);
    cfg
}

fn trigger() -> InboundMessage {
    InboundMessage::new(C2, br#"{"msg": "S3 SYNC"}"#.to_vec())
}

struct Running {
    bus: MemoryBus,
    tx: tokio::sync::mpsc::Sender<InboundMessage>,
    events: broadcast::Receiver<Event>,
    token: CancellationToken,
    task: JoinHandle<Result<(), RuntimeError>>,
}

fn start(cfg: AgentConfig) -> Running {
    let (bus, tx, rx) = MemoryBus::new(16);
    let agent = AgentBuilder::new(cfg, Arc::new(bus.clone())).build();
    let events = agent.events().subscribe();
    let token = CancellationToken::new();
    let task = tokio::spawn(agent.run_until(rx, token.clone()));
    Running {
        bus,
        tx,
        events,
        token,
        task,
    }
}

impl Running {
    async fn send(&self, msg: InboundMessage) {
        self.tx.send(msg).await.expect("agent is reading");
    }

    async fn wait_for_status(&self, line: &str) {
        let found = self
            .bus
            .wait_until(WAIT, |out| {
                out.iter().any(|m| m.status_text().as_deref() == Some(line))
            })
            .await;
        assert!(found, "status {line:?} never published");
    }

    async fn wait_for_status_count(&self, n: usize) {
        let reached = self
            .bus
            .wait_until(WAIT, |out| {
                out.iter().filter(|m| m.kind == OutboundKind::Status).count() >= n
            })
            .await;
        assert!(reached, "fewer than {n} status lines published");
    }

    async fn wait_for_event(&mut self, kind: EventKind) -> Event {
        tokio::time::timeout(WAIT, async {
            loop {
                match self.events.recv().await {
                    Ok(ev) if ev.kind == kind => return ev,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no {kind:?} event"))
    }

    /// Cancels the agent and waits for its graceful shutdown.
    async fn finish(self) -> MemoryBus {
        self.token.cancel();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("agent exited in time")
            .expect("agent task joined")
            .expect("agent returned Ok");
        self.bus
    }
}

#[tokio::test]
async fn registration_is_published_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let agent = start(config(dir.path(), "exit 0"));
    assert!(agent.bus.wait_until(WAIT, |out| !out.is_empty()).await);
    let bus = agent.finish().await;

    let out = bus.outbound().await;
    assert_eq!(out[0].kind, OutboundKind::Registration);
    assert_eq!(out[0].payload, "S3 Uploader Registration");
}

#[tokio::test]
async fn trigger_without_pattern_syncs_whole_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let agent = start(config(dir.path(), r#"echo "$@""#));
    agent.send(trigger()).await;
    agent.wait_for_status_count(3).await;
    let bus = agent.finish().await;

    let src = dir.path().display();
    assert_eq!(
        bus.status_lines().await,
        vec![
            format!("syncing dir: {src}"),
            format!(r#"sh -c echo "$@" sync {src} my-bucket"#),
            format!("{src} my-bucket\n"),
        ]
    );
}

#[tokio::test]
async fn include_pattern_excludes_everything_else() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), r#"echo "$@""#);
    cfg.include_pattern = Some("*.flac".into());
    let agent = start(cfg);
    agent.send(trigger()).await;
    agent.wait_for_status_count(3).await;
    let bus = agent.finish().await;

    let lines = bus.status_lines().await;
    assert_eq!(
        lines.last().map(String::as_str),
        Some(format!("{} my-bucket --exclude * --include *.flac\n", dir.path().display()).as_str())
    );
}

#[tokio::test]
async fn unrecognized_command_publishes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut agent = start(config(dir.path(), "echo started"));
    agent
        .send(InboundMessage::new(C2, br#"{"msg": "REBOOT"}"#.to_vec()))
        .await;
    agent.send(InboundMessage::new(C2, b"{not json".to_vec())).await;
    agent.wait_for_event(EventKind::TriggerIgnored).await;
    let bus = agent.finish().await;

    let out = bus.outbound().await;
    assert_eq!(out.len(), 1, "only the registration: {out:?}");
    assert_eq!(out[0].kind, OutboundKind::Registration);
}

#[tokio::test]
async fn missing_executable_reports_once_per_trigger_and_keeps_serving() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "");
    cfg.sync_command = SyncCommand::new("syncvisor-test-missing-aws");
    cfg.announce_command = false;
    let mut agent = start(cfg);

    agent.send(trigger()).await;
    agent.wait_for_event(EventKind::LaunchFailed).await;
    agent.send(trigger()).await;
    agent.wait_for_event(EventKind::LaunchFailed).await;
    let bus = agent.finish().await;

    let lines = bus.status_lines().await;
    assert_eq!(lines.len(), 4, "{lines:?}");
    assert!(lines[0].starts_with("syncing dir:"));
    assert!(lines[1].starts_with("sync failed to start:"));
    assert!(lines[2].starts_with("syncing dir:"));
    assert!(lines[3].starts_with("sync failed to start:"));
}

#[tokio::test]
async fn nonzero_exit_reports_stderr() {
    let dir = tempfile::tempdir().expect("tempdir");
    let agent = start(config(
        dir.path(),
        "echo 'upload: partial'; echo 'fatal error: bucket does not exist' >&2; exit 2",
    ));
    agent.send(trigger()).await;
    agent.wait_for_status_count(3).await;
    let bus = agent.finish().await;

    let lines = bus.status_lines().await;
    assert_eq!(
        lines.last().map(String::as_str),
        Some("fatal error: bucket does not exist\n")
    );
}

#[tokio::test]
async fn heartbeats_keep_cadence_during_long_sync() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "sleep 0.5; echo done");
    cfg.heartbeat_interval = Duration::from_millis(50);
    cfg.heartbeat_payload = "alive".into();
    let agent = start(cfg);

    agent.send(trigger()).await;
    agent.wait_for_status("done\n").await;
    let bus = agent.finish().await;

    let out = bus.outbound().await;
    let is_status = |m: &OutboundMessage, prefix: &str| {
        m.status_text().is_some_and(|t| t.starts_with(prefix))
    };
    let begin = out
        .iter()
        .position(|m| is_status(m, "syncing dir:"))
        .expect("begin reported");
    let done = out
        .iter()
        .position(|m| is_status(m, "done"))
        .expect("outcome reported");
    let window = &out[begin..=done];
    let beats: Vec<&OutboundMessage> = window
        .iter()
        .filter(|m| m.kind == OutboundKind::Heartbeat)
        .collect();
    assert!(beats.len() >= 5, "only {} heartbeats during a 500ms sync", beats.len());
    assert!(beats.iter().all(|m| m.payload == "alive"));

    // 50ms interval, at most 50ms jitter, measured across the whole live window
    let stamps: Vec<u64> = std::iter::once(window[0].timestamp_ms)
        .chain(beats.iter().map(|m| m.timestamp_ms))
        .chain(std::iter::once(window[window.len() - 1].timestamp_ms))
        .collect();
    for pair in stamps.windows(2) {
        let gap = pair[1].saturating_sub(pair[0]);
        assert!(gap <= 100, "heartbeat gap of {gap}ms while a sync was live: {stamps:?}");
    }
}

#[tokio::test]
async fn closed_inbound_keeps_agent_alive_until_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "echo ok");
    cfg.heartbeat_interval = Duration::from_millis(20);
    let (bus, tx, rx) = MemoryBus::new(4);
    let agent = AgentBuilder::new(cfg, Arc::new(bus.clone())).build();
    let token = CancellationToken::new();
    let task = tokio::spawn(agent.run_until(rx, token.clone()));

    drop(tx);
    let beating = bus
        .wait_until(WAIT, |out| {
            out.iter().filter(|m| m.kind == OutboundKind::Heartbeat).count() >= 5
        })
        .await;
    assert!(beating, "heartbeats stopped after the inbound channel closed");
    assert!(!task.is_finished());

    token.cancel();
    tokio::time::timeout(WAIT, task)
        .await
        .expect("agent exited in time")
        .expect("agent task joined")
        .expect("agent returned Ok");
}

#[tokio::test]
async fn publish_failures_never_stop_the_loop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut agent = start(config(dir.path(), "echo ok"));
    agent.bus.set_failing(true);

    agent.send(trigger()).await;
    agent.wait_for_event(EventKind::PublishFailed).await;
    agent.wait_for_event(EventKind::SyncSucceeded).await;

    agent.bus.set_failing(false);
    agent.send(trigger()).await;
    agent.wait_for_status("ok\n").await;
    agent.finish().await;
}

#[tokio::test]
async fn busy_triggers_are_dropped_by_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "sleep 0.3; echo once");
    cfg.announce_command = false;
    let mut agent = start(cfg);

    agent.send(trigger()).await;
    agent.wait_for_event(EventKind::SyncStarted).await;
    agent.send(trigger()).await;
    agent.wait_for_event(EventKind::TriggerDropped).await;
    agent.wait_for_status("once\n").await;
    let bus = agent.finish().await;

    let src = dir.path().display();
    assert_eq!(
        bus.status_lines().await,
        vec![format!("syncing dir: {src}"), "once\n".to_string()]
    );
}

#[tokio::test]
async fn queued_trigger_runs_after_live_sync() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "sleep 0.2; echo pass");
    cfg.announce_command = false;
    cfg.busy_policy = BusyPolicy::Queue;
    let mut agent = start(cfg);

    agent.send(trigger()).await;
    agent.wait_for_event(EventKind::SyncStarted).await;
    agent.send(trigger()).await;
    agent.send(trigger()).await;
    // begin + outcome for the live sync, then for the queued one
    agent.wait_for_status_count(4).await;
    let bus = agent.finish().await;

    let passes = bus
        .status_lines()
        .await
        .iter()
        .filter(|l| l.as_str() == "pass\n")
        .count();
    assert_eq!(passes, 2);
}

#[tokio::test]
async fn cancellation_kills_the_live_sync() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "exec sleep 30");
    cfg.announce_command = false;
    let mut agent = start(cfg);

    agent.send(trigger()).await;
    let started = agent.wait_for_event(EventKind::SyncStarted).await;
    agent.token.cancel();

    let terminated = agent.wait_for_event(EventKind::ChildTerminated).await;
    assert_eq!(terminated.pid, started.pid);
    tokio::time::timeout(WAIT, agent.task)
        .await
        .expect("agent exited in time")
        .expect("agent task joined")
        .expect("agent returned Ok");

    // the killed sync never produces an outcome line
    assert_eq!(agent.bus.status_lines().await.len(), 1);
}
