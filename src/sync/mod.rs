//! Sync task runner: command composition, process handle, outcome classification.
//!
//! - [`SyncSpec`] / [`SyncCommand`]: immutable description of what to run;
//! - [`SyncRunner`]: the single live-task slot (`start`, `poll`, `terminate`);
//! - [`SyncHandle`]: one in-flight process with captured output;
//! - [`SyncOutcome`]: exit code plus both output streams.

mod handle;
mod outcome;
mod runner;
mod spec;

pub use handle::{SyncHandle, SyncPoll};
pub use outcome::SyncOutcome;
pub use runner::SyncRunner;
pub use spec::{SyncCommand, SyncSpec};
