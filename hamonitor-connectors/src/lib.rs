//! Message Bus Connectors for HAMonitor
//!
//! ## Overview
//!
//! Everything between a presence event and the broker lives here. The core
//! decides *what* to say; this crate decides how and how often to say it.
//!
//! ## Layers
//!
//! ### Transport (`AsyncConnector`)
//!
//! The publish boundary: `send(topic, payload, retain)`. Semantics are
//! "at-least-attempted" with FIFO delivery per connection and nothing more.
//! Two implementations ship:
//!
//! - [`mqtt::MqttConnector`]: `rumqttc` client with bounded connect retries
//!   and a background event-loop driver that reconnects on its own.
//! - [`memory::MemoryConnector`]: records every message; used by tests and by
//!   `--dry-run`, where it logs instead of talking to a broker.
//!
//! ### Delivery (`publisher`)
//!
//! [`publisher::ReliablePublisher`] publishes each transition immediately and
//! once more after a redundancy delay, so a single dropped message cannot
//! leave Home Assistant showing the wrong state. A newer transition cancels
//! the older duplicate before scheduling its own.
//!
//! ### Discovery (`discovery`)
//!
//! Retained Home Assistant MQTT discovery config so the sensor shows up as a
//! `binary_sensor` with `device_class: motion` without manual YAML.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hamonitor_connectors::memory::MemoryConnector;
//! use hamonitor_connectors::publisher::ReliablePublisher;
//! use hamonitor_connectors::DEFAULT_TOPIC;
//! use hamonitor_core::PresenceEvent;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = Arc::new(MemoryConnector::new());
//! let mut publisher =
//!     ReliablePublisher::new(Arc::clone(&connector), DEFAULT_TOPIC, Duration::from_secs(30));
//!
//! publisher.on_event(&PresenceEvent::MotionStarted { at: 5_000 }).await?;
//! assert_eq!(connector.payloads(), vec!["true"]);
//!
//! publisher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod memory;
pub mod publisher;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use discovery::{DiscoveryConfig, DiscoveryDevice};
pub use memory::MemoryConnector;
pub use publisher::{PublishError, PublishEvent, PublisherStats, ReliablePublisher};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttError, QoS};

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Topic presence state is published on unless configured otherwise
pub const DEFAULT_TOPIC: &str = "kinect/motion";

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,
}

/// Publish boundary shared by all connectors
///
/// `send` takes `&self` so one connection can be shared between the
/// immediate publish path and a pending redundant publish.
#[async_trait::async_trait]
pub trait AsyncConnector: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish `data` on `topic`
    async fn send(&self, topic: &str, data: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_failure(&mut self, error: &impl std::fmt::Display) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

/// Lock shared statistics, ignoring poisoning
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
