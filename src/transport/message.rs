use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Raw message delivered by the transport on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Channel an outbound message was published on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    /// Free-text status line on the status topic.
    Status,
    /// Periodic liveness payload.
    Heartbeat,
    /// One-time announcement at startup.
    Registration,
}

/// Unit of observability sent to the bus.
///
/// `payload` is already encoded (status lines are JSON strings, e.g. `"\"syncing dir: /data\""`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub kind: OutboundKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub topic: Option<String>,
    pub payload: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl OutboundMessage {
    pub fn new(kind: OutboundKind, topic: Option<&str>, payload: &str) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64)
            .unwrap_or(0);
        Self {
            kind,
            topic: topic.map(str::to_owned),
            payload: payload.to_owned(),
            timestamp_ms,
        }
    }

    /// Decodes a status payload back into the text line it carries.
    ///
    /// Returns `None` if the payload is not a JSON string.
    pub fn status_text(&self) -> Option<String> {
        serde_json::from_str::<String>(&self.payload).ok()
    }
}
