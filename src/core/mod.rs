//! Runtime core: configuration, wiring and the scheduler loop.
//!
//! Internal modules:
//! - [`agent`]: the single-task loop multiplexing heartbeat, inbound triggers and sync polling;
//! - [`builder`]: wires reporter, runner and handler from an [`AgentConfig`];
//! - [`config`]: settings and environment loading;
//! - [`shutdown`]: cross-platform termination signal handling.

mod agent;
mod builder;
mod config;
mod shutdown;

pub use agent::Agent;
pub use builder::AgentBuilder;
pub use config::AgentConfig;
