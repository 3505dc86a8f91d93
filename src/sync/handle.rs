//! # One in-flight sync process.
//!
//! [`SyncHandle`] owns the child process and two background readers that drain
//! stdout/stderr into memory while the process runs. Draining concurrently keeps
//! the child from blocking on a full pipe; nothing is streamed to the bus before
//! the process ends.
//!
//! ## Completion
//! ```text
//! poll()  ── try_wait() ── None ─────────────────────────► Running
//!              └─ Some(status) ── readers done? ── no ──► Running
//!                                        └─ yes ───────► Exited(SyncOutcome)
//! wait()  ── child.wait().await ── readers.await ──────► SyncOutcome
//! ```
//!
//! `poll` never blocks and is what the scheduler loop calls; `wait` is the async
//! equivalent and is cancel-safe.

use std::io;
use std::process::ExitStatus;
use std::time::Instant;

use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::error::SyncError;

use super::outcome::SyncOutcome;

type Reader = JoinHandle<io::Result<Vec<u8>>>;

/// Result of a non-blocking [`SyncHandle::poll`].
#[derive(Debug)]
pub enum SyncPoll {
    /// Process (or one of its output streams) is still open.
    Running,
    /// Process exited and both streams were fully captured.
    Exited(SyncOutcome),
}

/// Live external sync process.
#[derive(Debug)]
pub struct SyncHandle {
    child: Child,
    pid: Option<u32>,
    started_at: Instant,
    stdout: Option<Reader>,
    stderr: Option<Reader>,
    status: Option<ExitStatus>,
}

impl SyncHandle {
    /// Wraps a freshly spawned child whose stdout/stderr are piped.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(mut child: Child) -> Self {
        let pid = child.id();
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);
        Self {
            child,
            pid,
            started_at: Instant::now(),
            stdout,
            stderr,
            status: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Checks for completion without blocking.
    ///
    /// Output buffers are moved into the returned outcome, so the handle should be
    /// dropped once `Exited` was observed.
    pub fn poll(&mut self) -> Result<SyncPoll, SyncError> {
        if self.status.is_none() {
            match self.child.try_wait().map_err(SyncError::Wait)? {
                Some(status) => self.status = Some(status),
                None => return Ok(SyncPoll::Running),
            }
        }
        let readers_done = [&self.stdout, &self.stderr]
            .into_iter()
            .flatten()
            .all(JoinHandle::is_finished);
        if !readers_done {
            return Ok(SyncPoll::Running);
        }

        let stdout = take_finished(&mut self.stdout)?;
        let stderr = take_finished(&mut self.stderr)?;
        Ok(SyncPoll::Exited(self.outcome(stdout, stderr)?))
    }

    /// Waits until the process exits and both streams are captured.
    pub async fn wait(&mut self) -> Result<SyncOutcome, SyncError> {
        if self.status.is_none() {
            self.status = Some(self.child.wait().await.map_err(SyncError::Wait)?);
        }
        let stdout = join_reader(&mut self.stdout).await?;
        let stderr = join_reader(&mut self.stderr).await?;
        self.outcome(stdout, stderr)
    }

    /// Kills the process and reaps it; output readers are abandoned.
    ///
    /// Grandchildren that inherited the pipes may keep them open, so the readers
    /// are aborted instead of awaited.
    pub(crate) async fn kill(&mut self) -> Result<(), SyncError> {
        if self.status.is_none() {
            self.child.kill().await.map_err(SyncError::Wait)?;
        }
        for reader in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            reader.abort();
        }
        Ok(())
    }

    fn outcome(&self, stdout: Vec<u8>, stderr: Vec<u8>) -> Result<SyncOutcome, SyncError> {
        let status = self
            .status
            .ok_or_else(|| SyncError::Wait(io::Error::other("process not reaped")))?;
        Ok(SyncOutcome::from_exit(
            status,
            stdout,
            stderr,
            self.pid,
            self.started_at.elapsed(),
        ))
    }
}

fn spawn_reader<R>(mut stream: R) -> Reader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok(buf)
    })
}

/// Takes the output of a reader that is known to be finished.
fn take_finished(slot: &mut Option<Reader>) -> Result<Vec<u8>, SyncError> {
    let Some(mut reader) = slot.take() else {
        return Ok(Vec::new());
    };
    match (&mut reader).now_or_never() {
        Some(res) => flatten_join(res),
        None => {
            *slot = Some(reader);
            Err(SyncError::Wait(io::Error::other("output reader still running")))
        }
    }
}

async fn join_reader(slot: &mut Option<Reader>) -> Result<Vec<u8>, SyncError> {
    let Some(reader) = slot.as_mut() else {
        return Ok(Vec::new());
    };
    let res = reader.await;
    slot.take();
    flatten_join(res)
}

fn flatten_join(
    res: Result<io::Result<Vec<u8>>, tokio::task::JoinError>,
) -> Result<Vec<u8>, SyncError> {
    res.map_err(|e| SyncError::Wait(io::Error::other(e)))?
        .map_err(SyncError::Wait)
}
