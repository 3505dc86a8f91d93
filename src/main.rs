//! `syncvisor` binary: environment-configured agent behind a JSON-lines stdio transport.
//!
//! Stdout carries outbound bus messages; logs go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use syncvisor::{AgentBuilder, AgentConfig, StdioBus, Subscribe};

const INBOUND_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AgentConfig::from_env().context("invalid configuration")?;

    let default_level = if cfg.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        cmd = %cfg.sync_spec().display_command(),
        "syncvisor configured"
    );

    let (bus, inbound) = StdioBus::spawn(INBOUND_CAPACITY);

    #[allow(unused_mut)]
    let mut subs: Vec<Arc<dyn Subscribe>> = Vec::new();
    #[cfg(feature = "logging")]
    subs.push(Arc::new(syncvisor::LogWriter::new()));

    let agent = AgentBuilder::new(cfg, Arc::new(bus))
        .with_subscribers(subs)
        .build();
    agent.run(inbound).await.context("agent stopped with an error")?;
    Ok(())
}
