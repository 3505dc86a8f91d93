//! # Sync task runner: the single live-task slot.
//!
//! [`SyncRunner`] launches, polls and reaps at most **one** external sync process.
//!
//! ## Lifecycle
//! ```text
//!            start() ──► validate source dir ──► spawn (stdout/stderr piped)
//!   Idle ─────────────────────────────────────────────────────────► Live(handle)
//!    ▲                                                                  │
//!    │   poll() ── Running ──► (stay Live)                              │
//!    └────────── Exited(outcome) / Err(Wait) ◄──────────────────────────┘
//!
//!   terminate(grace) ── kill + reap (≤ grace) ──► Idle
//! ```
//!
//! ## Rules
//! - `start` while live fails with [`SyncError::AlreadyRunning`] (no second process).
//! - Launch problems never leave a live handle behind.
//! - The child is spawned with `kill_on_drop`, so dropping the runner never orphans it.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{RuntimeError, SyncError};

use super::handle::{SyncHandle, SyncPoll};
use super::outcome::SyncOutcome;
use super::spec::SyncSpec;

/// Owner of the single live-task slot.
#[derive(Debug)]
pub struct SyncRunner {
    spec: Arc<SyncSpec>,
    live: Option<SyncHandle>,
}

impl SyncRunner {
    pub fn new(spec: Arc<SyncSpec>) -> Self {
        Self { spec, live: None }
    }

    pub fn spec(&self) -> &SyncSpec {
        &self.spec
    }

    /// Returns `true` while a process is started and not yet reaped.
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Pid of the live process, if any.
    pub fn live_pid(&self) -> Option<u32> {
        self.live.as_ref().and_then(SyncHandle::pid)
    }

    /// Launches the sync process without waiting for it.
    ///
    /// Returns the pid reported by the OS.
    pub fn start(&mut self) -> Result<Option<u32>, SyncError> {
        if let Some(handle) = &self.live {
            return Err(SyncError::AlreadyRunning { pid: handle.pid() });
        }

        let source = self.spec.source_dir();
        if !source.is_dir() {
            return Err(SyncError::InvalidSource {
                path: source.to_path_buf(),
            });
        }

        let program = &self.spec.command().program;
        let child = Command::new(program)
            .args(self.spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SyncError::Launch {
                program: program.clone(),
                source,
            })?;

        let handle = SyncHandle::new(child);
        let pid = handle.pid();
        self.live = Some(handle);
        Ok(pid)
    }

    /// Non-blocking check of the live process.
    ///
    /// Returns `None` while idle or still running. A `Some` result frees the slot.
    pub fn poll(&mut self) -> Option<Result<SyncOutcome, SyncError>> {
        let handle = self.live.as_mut()?;
        let res = match handle.poll() {
            Ok(SyncPoll::Running) => return None,
            Ok(SyncPoll::Exited(outcome)) => Ok(outcome),
            Err(e) => Err(e),
        };
        self.live = None;
        Some(res)
    }

    /// Waits for the live process to finish. Returns `None` when idle.
    pub async fn wait(&mut self) -> Option<Result<SyncOutcome, SyncError>> {
        let handle = self.live.as_mut()?;
        let res = handle.wait().await;
        self.live = None;
        Some(res)
    }

    /// Kills the live process and reaps it within `grace`.
    ///
    /// Returns the pid of the terminated process, or `None` when idle.
    pub async fn terminate(&mut self, grace: Duration) -> Result<Option<u32>, RuntimeError> {
        let Some(mut handle) = self.live.take() else {
            return Ok(None);
        };
        let pid = handle.pid();

        match tokio::time::timeout(grace, handle.kill()).await {
            Ok(Ok(())) => Ok(pid),
            Ok(Err(e)) => {
                tracing::warn!(?pid, err = %e, "failed to kill sync process");
                Ok(pid)
            }
            Err(_) => Err(RuntimeError::GraceExceeded { grace, pid }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncCommand;

    fn sh(script: &str) -> SyncCommand {
        // `sh -c <script> sync <src> <dst> ...`: positional args land in $1, $2, ...
        SyncCommand::new("sh").with_base_args(["-c", script, "sync"])
    }

    fn runner(dir: &std::path::Path, cmd: SyncCommand) -> SyncRunner {
        SyncRunner::new(Arc::new(
            SyncSpec::new(dir, "bucket").with_command(cmd),
        ))
    }

    #[tokio::test]
    async fn success_captures_both_streams() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = runner(dir.path(), sh("echo \"to $2\"; echo warn >&2"));

        r.start().expect("start");
        assert!(r.is_live());
        let outcome = r.wait().await.expect("live").expect("outcome");

        assert!(!r.is_live());
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout_text(), "to bucket\n");
        assert_eq!(outcome.stderr_text(), "warn\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure_not_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = runner(dir.path(), sh("echo partial; echo denied >&2; exit 3"));

        r.start().expect("start");
        let outcome = loop {
            if let Some(res) = r.poll() {
                break res.expect("outcome");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout_text(), "partial\n");
        assert_eq!(outcome.report_text(), "denied\n");
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_live() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = runner(dir.path(), sh("exec sleep 5"));

        let pid = r.start().expect("start");
        let err = r.start().expect_err("second start");
        assert!(matches!(err, SyncError::AlreadyRunning { pid: p } if p == pid));

        assert_eq!(r.terminate(Duration::from_secs(2)).await.expect("terminate"), pid);
        assert!(!r.is_live());
    }

    #[tokio::test]
    async fn missing_executable_is_launch_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = runner(dir.path(), SyncCommand::new("syncvisor-no-such-binary"));

        let err = r.start().expect_err("launch");
        assert_eq!(err.as_label(), "sync_launch_failed");
        assert!(!r.is_live());
        assert!(r.poll().is_none());
    }

    #[tokio::test]
    async fn missing_source_is_rejected_before_spawn() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gone = dir.path().join("gone");
        let mut r = runner(&gone, sh("exit 0"));

        let err = r.start().expect_err("invalid source");
        assert!(matches!(err, SyncError::InvalidSource { ref path } if path == &gone));
        assert!(!r.is_live());
    }

    #[tokio::test]
    async fn terminate_when_idle_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = runner(dir.path(), sh("exit 0"));
        assert_eq!(r.terminate(Duration::from_millis(10)).await.expect("idle"), None);
    }
}
