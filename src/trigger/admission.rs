//! # Busy policy
//!
//! The agent has exactly one sync slot. When a valid trigger arrives while a sync
//! is live, the busy policy decides what to do with it.
//!
//! ## Variants
//! - `Drop` (default): ignore the request and log it; the controller re-triggers if needed.
//! - `Queue`: remember **one** pending request and start it as soon as the live sync is reaped.
//!   Further triggers while one is already pending coalesce into it, since a second
//!   mirror of the same directory would transfer the same files.
//!
//! ## Invariants
//! - Syncs never run in parallel.
//! - A live sync is never interrupted by a trigger.

use std::str::FromStr;

use crate::error::ConfigError;

/// Policy controlling triggers that arrive while a sync is live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Ignore the trigger.
    #[default]
    Drop,
    /// Keep one pending trigger (coalescing duplicates).
    Queue,
}

impl FromStr for BusyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(BusyPolicy::Drop),
            "queue" => Ok(BusyPolicy::Queue),
            _ => Err(ConfigError::Invalid {
                name: "BUSY_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Queue".parse::<BusyPolicy>(), Ok(BusyPolicy::Queue));
        assert_eq!(" drop ".parse::<BusyPolicy>(), Ok(BusyPolicy::Drop));
        assert!("replace".parse::<BusyPolicy>().is_err());
    }
}
