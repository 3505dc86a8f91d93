//! # syncvisor
//!
//! **syncvisor** is a remote-triggered directory sync agent. It listens on a message
//! bus for a controller command, pushes a local directory to an object store by
//! launching an external sync executable (`aws s3 sync` by default), and reports
//! progress and outcome back over the same bus next to a periodic heartbeat.
//!
//! It is meant for unattended edge devices: nothing it does is fatal except a
//! termination signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!      controller (C2)                                    object store
//!        │ {"msg": "S3 SYNC"}                                   ▲
//!        ▼                                                      │
//! ┌──────────────┐ InboundMessage ┌──────────────────────────┐  │
//! │ MessageBus   │ ─────────────► │ Agent (scheduler loop)   │  │
//! │ (transport)  │                │  ├─ heartbeat interval   │  │
//! │              │ ◄───────────── │  ├─ TriggerHandler ──────┼──┼─► SyncRunner ─► child process
//! └──────────────┘ status /       │  │   (Idle / Running)    │     (try_wait + stream readers)
//!                  heartbeat /    │  └─ StatusReporter       │
//!                  registration   └────────────┬─────────────┘
//!                                              │ publish(Event)
//!                                              ▼
//!                                   Bus (broadcast, local only)
//!                                              ▼
//!                                        SubscriberSet
//!                                     ├─► LogWriter (tracing)
//!                                     └─► custom subscribers
//! ```
//!
//! ### Lifecycle of one trigger
//! ```text
//! inbound {"msg": "S3 SYNC"} on the trigger topic
//!   ├─ malformed / unrecognized ─► TriggerIgnored (local only), nothing published
//!   ├─ sync already live ────────► BusyPolicy::Drop  ─► TriggerDropped
//!   │                              BusyPolicy::Queue ─► TriggerQueued (one pending, coalesced)
//!   └─ idle:
//!        ├─ status "syncing dir: <dir>"
//!        ├─ status "<composed command line>"
//!        └─ SyncRunner::start()
//!             ├─ Err ─► status "sync failed to start: ...", stay idle
//!             └─ Ok  ─► Running; the loop polls every poll_interval
//!                        ├─ exit 0   ─► status <stdout>
//!                        └─ exit ≠ 0 ─► status <stderr>
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                  |
//! |-------------------|----------------------------------------------------------------|-------------------------------------|
//! | **Agent**         | Scheduler loop, graceful shutdown.                             | [`Agent`], [`AgentBuilder`]         |
//! | **Configuration** | Environment-driven settings with defaults.                     | [`AgentConfig`]                     |
//! | **Sync**          | Command composition, non-blocking process supervision.        | [`SyncSpec`], [`SyncRunner`]        |
//! | **Transport**     | Remote bus seam plus memory and stdio implementations.         | [`MessageBus`], [`MemoryBus`]       |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics).                 | [`Subscribe`]                       |
//! | **Errors**        | Typed errors per concern.                                      | [`RuntimeError`], [`SyncError`]     |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`].
//! - `stdio` (default): exports `StdioBus`, a JSON-lines transport over stdin/stdout.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use syncvisor::{AgentBuilder, AgentConfig, InboundMessage, MemoryBus, OutboundKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = std::env::temp_dir();
//!     let mut cfg = AgentConfig::new("uploader/status", "c2/sync", &dir, "my-bucket");
//!     cfg.sync_command = syncvisor::SyncCommand::new("true");
//!
//!     let (bus, tx, rx) = MemoryBus::new(16);
//!     let agent = AgentBuilder::new(cfg, Arc::new(bus.clone())).build();
//!     let token = CancellationToken::new();
//!     let running = tokio::spawn(agent.run_until(rx, token.clone()));
//!
//!     tx.send(InboundMessage::new("c2/sync", br#"{"msg": "S3 SYNC"}"#.to_vec())).await?;
//!     // "syncing dir", the command line, then the (empty) stdout of `true`
//!     let reported = bus
//!         .wait_until(Duration::from_secs(5), |out| {
//!             out.iter().filter(|m| m.kind == OutboundKind::Status).count() == 3
//!         })
//!         .await;
//!     assert!(reported);
//!
//!     token.cancel();
//!     running.await??;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod reporter;

pub mod events;
pub mod subscribers;
pub mod sync;
pub mod transport;
pub mod trigger;

// ---- Public re-exports ----

pub use core::{Agent, AgentBuilder, AgentConfig};
pub use error::{BusError, ConfigError, RuntimeError, SyncError};
pub use events::{Event, EventKind};
pub use reporter::{DEFAULT_HEARTBEAT_PAYLOAD, DEFAULT_REGISTRATION_PAYLOAD, StatusReporter};
pub use subscribers::{Subscribe, SubscriberSet};
pub use sync::{SyncCommand, SyncOutcome, SyncRunner, SyncSpec};
pub use transport::{InboundMessage, MemoryBus, MessageBus, OutboundKind, OutboundMessage};
pub use trigger::{BusyPolicy, DEFAULT_TRIGGER_COMMAND, TriggerHandler};

#[cfg(feature = "stdio")]
pub use transport::StdioBus;

// Built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::embedded::LogWriter;
