//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to stop. It is the
//! only external event that ends an agent started with [`crate::Agent::run`].
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (container stop, systemd)
//! - `SIGQUIT`
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use crate::error::RuntimeError;

/// Waits for a termination signal and returns its name.
///
/// Listeners are registered on first poll; registration failure is returned as
/// [`RuntimeError::Signal`].
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> Result<&'static str, RuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for a termination signal and returns its name.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> Result<&'static str, RuntimeError> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
