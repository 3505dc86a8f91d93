//! Error types used by the syncvisor agent.
//!
//! This module defines one enum per concern:
//!
//! - [`RuntimeError`] — errors raised by the scheduler loop itself.
//! - [`SyncError`] — errors raised while launching or reaping a sync process.
//! - [`BusError`] — errors raised by a [`MessageBus`](crate::transport::MessageBus) implementation.
//! - [`ConfigError`] — errors raised while reading configuration from the environment.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging.
//! A nonzero process exit is **not** an error: it is a regular
//! [`SyncOutcome`](crate::sync::SyncOutcome) with `success == false`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the scheduler loop.
///
/// These are the only errors that end [`Agent::run`](crate::Agent::run) with `Err`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The live sync process did not exit within the shutdown grace period.
    #[error("shutdown grace {grace:?} exceeded; sync process pid={pid:?} still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Pid of the process that could not be reaped.
        pid: Option<u32>,
    },

    /// Installing OS signal handlers failed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use syncvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), pid: None };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, pid } => {
                format!("grace exceeded after {grace:?}; pid={pid:?}")
            }
            RuntimeError::Signal(e) => format!("signal setup: {e}"),
        }
    }
}

/// # Errors produced by the sync task runner.
///
/// Launch problems (`InvalidSource`, `Launch`, `AlreadyRunning`) happen before any
/// process exists; `Wait` happens while reaping a process that did start.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SyncError {
    /// Source directory is missing or not a directory.
    #[error("invalid source directory {path:?}")]
    InvalidSource {
        /// The configured source directory.
        path: PathBuf,
    },

    /// The sync executable could not be spawned (missing binary, permissions, ...).
    #[error("failed to launch {program:?}: {source}")]
    Launch {
        /// Program that was being spawned.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A sync process is already live; at most one may run.
    #[error("sync already running (pid={pid:?})")]
    AlreadyRunning {
        /// Pid of the live process.
        pid: Option<u32>,
    },

    /// Waiting on or reading from the process failed after it was started.
    #[error("failed to reap sync process: {0}")]
    Wait(#[source] std::io::Error),
}

impl SyncError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use syncvisor::SyncError;
    ///
    /// let err = SyncError::InvalidSource { path: "/nope".into() };
    /// assert_eq!(err.as_label(), "sync_invalid_source");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::InvalidSource { .. } => "sync_invalid_source",
            SyncError::Launch { .. } => "sync_launch_failed",
            SyncError::AlreadyRunning { .. } => "sync_already_running",
            SyncError::Wait(_) => "sync_wait_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SyncError::InvalidSource { path } => {
                format!("source directory {} does not exist or is not a directory", path.display())
            }
            SyncError::Launch { program, source } => format!("could not start {program}: {source}"),
            SyncError::AlreadyRunning { pid } => format!("sync already running: pid={pid:?}"),
            SyncError::Wait(e) => format!("wait: {e}"),
        }
    }
}

/// # Errors produced by a message bus implementation.
///
/// The agent never propagates these: the status reporter logs and swallows them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// Payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport failed to deliver the message.
    #[error("publish to {topic:?} failed: {reason}")]
    Publish {
        /// Destination topic.
        topic: String,
        /// Transport-specific reason.
        reason: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Encode(_) => "bus_encode",
            BusError::Publish { .. } => "bus_publish_failed",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set (or empty).
    #[error("missing required variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}
