//! # Trigger payload decoding.
//!
//! Inbound payloads are JSON objects carrying at least a `msg` field:
//! `{"msg": "S3 SYNC"}`. Decoding fails closed: anything that is not valid UTF-8
//! JSON with a string `msg` is treated exactly like an unrecognized command.

use serde::Deserialize;

/// Default command string that starts a sync.
pub const DEFAULT_TRIGGER_COMMAND: &str = "S3 SYNC";

/// Decoded inbound trigger.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TriggerMessage {
    /// Command requested by the controller.
    #[serde(rename = "msg")]
    pub command: String,
}

/// What the handler should do with an inbound payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Recognized sync command.
    Sync,
    /// Malformed or unrecognized; carries a short reason for local logs only.
    Ignore(String),
}

impl TriggerMessage {
    /// Decodes a raw bus payload.
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Decodes `payload` and compares its command with `recognized`.
    ///
    /// The comparison is exact (case and whitespace sensitive).
    pub fn classify(payload: &[u8], recognized: &str) -> TriggerDecision {
        match Self::decode(payload) {
            Ok(msg) if msg.command == recognized => TriggerDecision::Sync,
            Ok(msg) => TriggerDecision::Ignore(format!("unrecognized command {:?}", msg.command)),
            Err(e) => TriggerDecision::Ignore(format!("malformed payload: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_command_syncs() {
        assert_eq!(
            TriggerMessage::classify(br#"{"msg": "S3 SYNC"}"#, DEFAULT_TRIGGER_COMMAND),
            TriggerDecision::Sync
        );
        // extra fields are tolerated
        assert_eq!(
            TriggerMessage::classify(br#"{"msg":"S3 SYNC","from":"c2"}"#, DEFAULT_TRIGGER_COMMAND),
            TriggerDecision::Sync
        );
    }

    #[test]
    fn everything_else_is_ignored() {
        let payloads: [&[u8]; 8] = [
            br#"{"msg": "S3 SYNC FILES"}"#,
            br#"{"msg": "s3 sync"}"#,
            br#"{"msg": 7}"#,
            br#"{"command": "S3 SYNC"}"#,
            br#""S3 SYNC""#,
            b"S3 SYNC",
            b"",
            &[0xff, 0xfe],
        ];
        for payload in payloads {
            assert!(
                matches!(
                    TriggerMessage::classify(payload, DEFAULT_TRIGGER_COMMAND),
                    TriggerDecision::Ignore(_)
                ),
                "payload {payload:?} should be ignored"
            );
        }
    }

    #[test]
    fn recognized_command_is_configurable() {
        assert_eq!(
            TriggerMessage::classify(br#"{"msg": "sync files"}"#, "sync files"),
            TriggerDecision::Sync
        );
    }
}
