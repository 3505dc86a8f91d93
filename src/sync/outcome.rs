//! Terminal result of one sync process.

use std::process::ExitStatus;
use std::time::Duration;

/// Classified result of a terminated sync process.
///
/// Built only from a reaped process, never partially. Both streams are kept
/// regardless of classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    /// `true` iff the process exited with code 0.
    pub success: bool,
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Everything the process wrote to standard output.
    pub stdout: Vec<u8>,
    /// Everything the process wrote to standard error.
    pub stderr: Vec<u8>,
    /// Pid the process ran under, if the OS reported one.
    pub pid: Option<u32>,
    /// Wall time between launch and reap.
    pub elapsed: Duration,
}

impl SyncOutcome {
    pub(crate) fn from_exit(
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        pid: Option<u32>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code(),
            stdout,
            stderr,
            pid,
            elapsed,
        }
    }

    /// Standard output decoded as UTF-8 (lossy).
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded as UTF-8 (lossy).
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// The stream reported to the controller: stdout on success, stderr on failure.
    pub fn report_text(&self) -> String {
        if self.success {
            self.stdout_text()
        } else {
            self.stderr_text()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool) -> SyncOutcome {
        SyncOutcome {
            success,
            exit_code: Some(if success { 0 } else { 1 }),
            stdout: b"upload: a.flac".to_vec(),
            stderr: b"fatal error: no credentials".to_vec(),
            pid: Some(1),
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn report_picks_stream_by_classification() {
        assert_eq!(outcome(true).report_text(), "upload: a.flac");
        assert_eq!(outcome(false).report_text(), "fatal error: no credentials");
    }

    #[test]
    fn invalid_utf8_is_lossy() {
        let mut o = outcome(true);
        o.stdout = vec![b'o', b'k', 0xff];
        assert_eq!(o.stdout_text(), "ok\u{fffd}");
    }
}
