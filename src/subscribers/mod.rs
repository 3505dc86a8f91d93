//! # Internal event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`](embedded::LogWriter).
//!
//! ## Architecture
//! ```text
//!   TriggerHandler / StatusReporter / Agent
//!        └── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                ├──► LogWriter (tracing)
//!                                                                └──► custom subscribers
//! ```

pub mod embedded;
mod subscriber;
mod subscriber_set;

pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
