//! Internal events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish
//! local diagnostics emitted by the trigger handler, status reporter and scheduler.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TriggerHandler`, `StatusReporter`, `Agent` (shutdown path),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Agent::subscriber_listener()` which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
