//! # Agent configuration.
//!
//! Provides [`AgentConfig`], the immutable settings the agent is built from.
//!
//! Config is used in two ways:
//! 1. **Process bootstrap**: [`AgentConfig::from_env`] reads the environment.
//! 2. **Embedding / tests**: construct it in code and hand it to [`crate::AgentBuilder`].
//!
//! ## Environment
//! | Variable              | Field               | Default                 |
//! |-----------------------|---------------------|-------------------------|
//! | `SEND_DATA_TOPIC`     | `status_topic`      | required                |
//! | `C2_TOPIC`            | `trigger_topic`     | required                |
//! | `TARGET_DIR`          | `source_dir`        | required                |
//! | `S3_BUCKET`           | `destination`       | required                |
//! | `INCLUDE_FILES`       | `include_pattern`   | none (sync everything)  |
//! | `MQTT_IP`             | `bus_endpoint`      | none                    |
//! | `DEBUG`               | `debug`             | `false`                 |
//! | `SYNC_COMMAND`        | `sync_command`      | `aws s3 sync`           |
//! | `SYNC_PROGRAM`        | `sync_command.program` | `aws`                |
//! | `SYNC_DEST_PREFIX`    | `sync_command.destination_prefix` | see below |
//! | `SYNC_TRIGGER`        | `trigger_command`   | `S3 SYNC`               |
//! | `HEARTBEAT_SECS`      | `heartbeat_interval`| `10`                    |
//! | `SHUTDOWN_GRACE_SECS` | `grace`             | `10`                    |
//! | `BUSY_POLICY`         | `busy_policy`       | `drop`                  |
//!
//! Empty variables count as unset.
//!
//! ## Sync command resolution
//! Applied in this order:
//! 1. `SYNC_COMMAND` replaces the whole command (program and leading arguments).
//! 2. `SYNC_PROGRAM` then replaces only the program, keeping the leading arguments
//!    from step 1 (or the default `s3 sync`).
//! 3. `SYNC_DEST_PREFIX` sets the destination prefix. When unset, the prefix is
//!    `s3://` if the resolved program is `aws` (by file name, so `/usr/local/bin/aws`
//!    counts) and empty otherwise.
//!
//! ## Sentinel values
//! - `heartbeat_interval = 0s` → heartbeats disabled
//! - `poll_interval = 0s` → clamped to 1ms (the loop must still yield)

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::reporter::{DEFAULT_HEARTBEAT_PAYLOAD, DEFAULT_REGISTRATION_PAYLOAD};
use crate::sync::{SyncCommand, SyncSpec};
use crate::trigger::{BusyPolicy, DEFAULT_TRIGGER_COMMAND};

/// Settings for one sync agent.
///
/// ## Field semantics
/// - `status_topic`: where status lines are published
/// - `trigger_topic`: the only topic whose messages can start a sync
/// - `include_pattern`: `None` mirrors the whole tree
/// - `bus_endpoint`: handed to the transport; the agent itself never connects
/// - `grace`: how long shutdown waits for the killed sync process to be reaped
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Topic for outbound status lines.
    pub status_topic: String,
    /// Topic carrying controller commands.
    pub trigger_topic: String,
    /// Directory pushed on every sync.
    pub source_dir: PathBuf,
    /// Destination identifier (bucket name), without the command's prefix.
    pub destination: String,
    /// Optional file filter (e.g. `*.flac`).
    pub include_pattern: Option<String>,
    /// Broker address for transports that need one.
    pub bus_endpoint: Option<String>,

    /// External sync executable and leading arguments.
    pub sync_command: SyncCommand,
    /// Command string (`msg` field) that starts a sync.
    pub trigger_command: String,
    /// What to do with triggers arriving while a sync is live.
    pub busy_policy: BusyPolicy,
    /// Report the composed command line after "syncing dir".
    pub announce_command: bool,

    /// Heartbeat period (`0s` = disabled).
    pub heartbeat_interval: Duration,
    /// How often the live sync process is polled for completion.
    pub poll_interval: Duration,
    /// Maximum wait for the killed sync process during shutdown.
    pub grace: Duration,

    /// Liveness payload.
    pub heartbeat_payload: String,
    /// One-time registration payload.
    pub registration_payload: String,

    /// Capacity of the internal event bus ring buffer (min 1).
    pub event_capacity: usize,
    /// Verbose local logging.
    pub debug: bool,
}

impl AgentConfig {
    /// Creates a config with defaults for everything but the four required settings.
    pub fn new(
        status_topic: impl Into<String>,
        trigger_topic: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            status_topic: status_topic.into(),
            trigger_topic: trigger_topic.into(),
            source_dir: source_dir.into(),
            destination: destination.into(),
            include_pattern: None,
            bus_endpoint: None,
            sync_command: SyncCommand::default(),
            trigger_command: DEFAULT_TRIGGER_COMMAND.to_string(),
            busy_policy: BusyPolicy::default(),
            announce_command: true,
            heartbeat_interval: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            grace: Duration::from_secs(10),
            heartbeat_payload: DEFAULT_HEARTBEAT_PAYLOAD.to_string(),
            registration_payload: DEFAULT_REGISTRATION_PAYLOAD.to_string(),
            event_capacity: 1024,
            debug: false,
        }
    }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut cfg = Self::new(
            require("SEND_DATA_TOPIC")?,
            require("C2_TOPIC")?,
            require("TARGET_DIR")?,
            require("S3_BUCKET")?,
        );
        cfg.include_pattern = get("INCLUDE_FILES").map(|p| p.trim().to_string());
        cfg.bus_endpoint = get("MQTT_IP");
        if let Some(v) = get("DEBUG") {
            cfg.debug = parse_flag("DEBUG", &v)?;
        }

        if let Some(line) = get("SYNC_COMMAND") {
            cfg.sync_command = SyncCommand::parse(&line).ok_or(ConfigError::Invalid {
                name: "SYNC_COMMAND",
                value: line.clone(),
            })?;
        }
        if let Some(program) = get("SYNC_PROGRAM") {
            cfg.sync_command.program = program;
        }
        cfg.sync_command.destination_prefix = match get("SYNC_DEST_PREFIX") {
            Some(prefix) => prefix,
            None if is_aws_cli(&cfg.sync_command.program) => S3_PREFIX.to_string(),
            None => String::new(),
        };
        if let Some(cmd) = get("SYNC_TRIGGER") {
            cfg.trigger_command = cmd;
        }
        if let Some(v) = get("BUSY_POLICY") {
            cfg.busy_policy = v.parse()?;
        }
        if let Some(v) = get("HEARTBEAT_SECS") {
            cfg.heartbeat_interval = parse_secs("HEARTBEAT_SECS", &v)?;
        }
        if let Some(v) = get("SHUTDOWN_GRACE_SECS") {
            cfg.grace = parse_secs("SHUTDOWN_GRACE_SECS", &v)?;
        }
        Ok(cfg)
    }

    /// Returns the heartbeat period as an `Option`.
    ///
    /// - `None` → heartbeats disabled
    /// - `Some(d)` → one heartbeat every `d`
    #[inline]
    pub fn heartbeat(&self) -> Option<Duration> {
        if self.heartbeat_interval == Duration::ZERO {
            None
        } else {
            Some(self.heartbeat_interval)
        }
    }

    /// Returns the completion poll period, clamped to at least 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Returns an event bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn event_capacity_clamped(&self) -> usize {
        self.event_capacity.max(1)
    }

    /// Composes the immutable sync description.
    pub fn sync_spec(&self) -> SyncSpec {
        let spec = SyncSpec::new(&self.source_dir, &self.destination)
            .with_command(self.sync_command.clone());
        match &self.include_pattern {
            Some(p) => spec.with_include_pattern(p.as_str()),
            None => spec,
        }
    }
}

const S3_PREFIX: &str = "s3://";

/// `aws`, `/usr/local/bin/aws`, `aws.exe`.
fn is_aws_cli(program: &str) -> bool {
    Path::new(program)
        .file_stem()
        .is_some_and(|stem| stem == "aws")
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
}
