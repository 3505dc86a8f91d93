//! # Trigger intake
//!
//! Decodes inbound controller messages and turns recognized ones into sync runs.
//!
//! - [`TriggerMessage`] decodes `{"msg": "..."}` payloads.
//! - [`BusyPolicy`] decides what happens to a trigger while a sync is live.
//! - [`TriggerHandler`] is the Idle/Running state machine driving [`crate::sync::SyncRunner`].

mod admission;
mod handler;
mod message;

pub use admission::BusyPolicy;
pub use handler::{Dispatch, HandlerState, TriggerHandler};
pub use message::{DEFAULT_TRIGGER_COMMAND, TriggerDecision, TriggerMessage};
