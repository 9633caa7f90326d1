//! In-memory connector
//!
//! Records every message instead of sending it. Tests use it to assert what
//! was published and when; the daemon uses it for `--dry-run`, where each
//! message is also logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::time::Instant;

use crate::{lock, AsyncConnector, ConnectionStats, ConnectorError};

/// A message captured by [`MemoryConnector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
    /// Runtime clock reading when the message was sent
    pub sent_at: Instant,
}

impl SentMessage {
    /// Payload as text, lossy
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Connector that keeps messages in memory
#[derive(Debug)]
pub struct MemoryConnector {
    messages: Mutex<Vec<SentMessage>>,
    online: AtomicBool,
    echo: bool,
    stats: Mutex<ConnectionStats>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    /// Create a connected, silent connector
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            echo: false,
            stats: Mutex::new(ConnectionStats::default()),
        }
    }

    /// Create a connector that logs every message at info level
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    /// Simulate the broker going away or coming back
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Every message sent so far
    pub fn messages(&self) -> Vec<SentMessage> {
        lock(&self.messages).clone()
    }

    /// Payloads sent so far, as text
    pub fn payloads(&self) -> Vec<String> {
        lock(&self.messages).iter().map(SentMessage::payload_str).collect()
    }

    /// Messages sent on `topic`
    pub fn messages_on(&self, topic: &str) -> Vec<SentMessage> {
        lock(&self.messages)
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Forget everything recorded
    pub fn clear(&self) {
        lock(&self.messages).clear();
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MemoryConnector {
    type Error = ConnectorError;

    async fn send(&self, topic: &str, data: &[u8], retain: bool) -> Result<(), Self::Error> {
        if !self.is_connected() {
            let err = ConnectorError::NotConnected;
            lock(&self.stats).record_failure(&err);
            return Err(err);
        }

        let message = SentMessage {
            topic: topic.to_string(),
            payload: data.to_vec(),
            retain,
            sent_at: Instant::now(),
        };

        if self.echo {
            log::info!(
                "[dry-run] {} <- {}{}",
                message.topic,
                message.payload_str(),
                if retain { " (retained)" } else { "" }
            );
        }

        lock(&self.stats).record_sent(data.len());
        lock(&self.messages).push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        lock(&self.stats).clone()
    }
}
