//! # JSON-lines transport over stdin/stdout.
//!
//! Lets the agent sit behind any broker bridge (an MQTT client, `mosquitto_sub | ... | mosquitto_pub`,
//! a sidecar) without linking a broker client.
//!
//! ## Wire format
//! ```text
//! stdin  (one per line): {"topic": "c2/sync", "payload": {"msg": "S3 SYNC"}}
//!                        {"topic": "c2/sync", "payload": "{\"msg\": \"S3 SYNC\"}"}
//! stdout (one per line): {"kind":"status","topic":"uploader/status","payload":"\"syncing dir: /data\"","timestamp_ms":...}
//!                        {"kind":"heartbeat","payload":"S3 Uploader Heartbeat","timestamp_ms":...}
//! ```
//!
//! A string `payload` is forwarded as-is; any other JSON value is re-encoded.
//! Lines that are not a `{topic, payload}` object are skipped.
//! EOF on stdin closes the inbound channel; the agent keeps heartbeating until it is
//! signalled to stop.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::error::BusError;

use super::message::{InboundMessage, OutboundKind, OutboundMessage};
use super::MessageBus;

#[derive(Deserialize)]
struct InboundLine {
    topic: String,
    payload: serde_json::Value,
}

/// Parses one stdin line into an inbound message.
pub(crate) fn parse_line(line: &str) -> Option<InboundMessage> {
    let parsed: InboundLine = serde_json::from_str(line.trim()).ok()?;
    let payload = match parsed.payload {
        serde_json::Value::String(s) => s.into_bytes(),
        other => other.to_string().into_bytes(),
    };
    Some(InboundMessage::new(parsed.topic, payload))
}

/// Stdout writer half; the reader half runs as a background task.
#[derive(Clone)]
pub struct StdioBus {
    out: Arc<Mutex<Stdout>>,
}

impl StdioBus {
    /// Starts reading stdin and returns the bus plus the inbound channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(inbound_capacity: usize) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = mpsc::channel(inbound_capacity.max(1));
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match parse_line(&line) {
                        Some(msg) => {
                            if tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => debug!(line = %line, "skipping malformed stdin line"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        debug!(err = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });
        (
            Self {
                out: Arc::new(Mutex::new(tokio::io::stdout())),
            },
            rx,
        )
    }

    async fn write(&self, msg: OutboundMessage) -> Result<(), BusError> {
        let mut line = serde_json::to_vec(&msg)?;
        line.push(b'\n');

        let topic = msg.topic.unwrap_or_default();
        let mut out = self.out.lock().await;
        let res = async {
            out.write_all(&line).await?;
            out.flush().await
        }
        .await;
        res.map_err(|e| BusError::Publish {
            topic,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MessageBus for StdioBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.write(OutboundMessage::new(OutboundKind::Status, Some(topic), payload))
            .await
    }

    async fn publish_heartbeat(&self, payload: &str) -> Result<(), BusError> {
        self.write(OutboundMessage::new(OutboundKind::Heartbeat, None, payload))
            .await
    }

    async fn publish_registration(&self, payload: &str) -> Result<(), BusError> {
        self.write(OutboundMessage::new(OutboundKind::Registration, None, payload))
            .await
    }
}
