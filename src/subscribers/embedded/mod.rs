//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders internal events through `tracing` (enabled with the `logging` feature).

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
