//! MQTT connector for HAMonitor
//!
//! Thin wrapper over `rumqttc` shaped for a long-running sensor bridge:
//!
//! - **Bounded startup**: the first connection is retried a fixed number of
//!   times (5 attempts, 5 s apart by default). If the broker never answers,
//!   the caller gets [`MqttError::ConnectFailed`] and the run ends.
//! - **Self-healing afterwards**: once connected, a background task drives
//!   the `rumqttc` event loop forever. Lost connections are re-established
//!   by the event loop itself; the task only tracks state and backs off.
//! - **Fail fast while down**: publishing while disconnected returns
//!   [`MqttError::NotConnected`] instead of queueing. Presence redundancy is
//!   handled one level up by the publisher.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hamonitor_connectors::mqtt::{MqttConfig, MqttConnector};
//! use hamonitor_connectors::AsyncConnector;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MqttConfig::new("homeassistant.local:1883")?
//!     .client_id("hamonitor-livingroom")
//!     .credentials("hamonitor", "secret");
//!
//! let mqtt = MqttConnector::connect(config).await?;
//! mqtt.send("kinect/motion", b"true", false).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{lock, AsyncConnector, ConnectionStats};

pub use rumqttc::QoS;

/// Standard unencrypted MQTT port
pub const DEFAULT_PORT: u16 = 1883;

/// Longest topic the protocol can carry
pub const MAX_TOPIC_LEN: usize = 65_535;

/// Smallest keep-alive the client accepts
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Request channel capacity between client handle and event loop
const CHANNEL_CAPACITY: usize = 16;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Broker address could not be parsed
    #[error("Invalid broker address `{0}`")]
    InvalidBroker(String),

    /// Topic cannot be published to
    #[error("Invalid topic `{topic}`: {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    /// Configuration rejected before connecting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broker never accepted the connection
    #[error("Could not connect to {broker} after {attempts} attempts: {reason}")]
    ConnectFailed {
        broker: String,
        attempts: u32,
        reason: String,
    },

    /// Connection is down
    #[error("Not connected to broker")]
    NotConnected,

    /// Client request channel closed or full
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// MQTT configuration
#[derive(Clone)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier, unique per broker
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Username and password
    pub credentials: Option<(String, String)>,
    /// Quality of service for publishes
    pub qos: QoS,
    /// Connection attempts before giving up at startup
    pub connect_attempts: u32,
    /// Delay between connection attempts, and between reconnects
    pub retry_delay: Duration,
    /// How long one attempt may wait for `ConnAck`
    pub connect_timeout: Duration,
}

impl fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("keep_alive", &self.keep_alive)
            .field("username", &self.credentials.as_ref().map(|(user, _)| user))
            .field("qos", &self.qos)
            .field("connect_attempts", &self.connect_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl MqttConfig {
    /// Create configuration from a `host[:port]` broker string
    pub fn new(broker: &str) -> Result<Self, MqttError> {
        let (host, port) = parse_broker(broker)?;
        Ok(Self {
            host,
            port: port.unwrap_or(DEFAULT_PORT),
            client_id: format!("hamonitor-{}", std::process::id()),
            keep_alive: Duration::from_secs(60),
            credentials: None,
            qos: QoS::AtLeastOnce,
            connect_attempts: 5,
            retry_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        })
    }

    /// Set client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Override the broker port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set username/password authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set publish QoS
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set how many times the first connection is attempted
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    /// Set delay between connection attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-attempt `ConnAck` timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port` for messages
    pub fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<(), MqttError> {
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client id must not be empty".into()));
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(MqttError::Config(format!(
                "keep-alive must be at least {}s",
                MIN_KEEP_ALIVE.as_secs()
            )));
        }
        if self.connect_attempts == 0 {
            return Err(MqttError::Config("at least one connect attempt is required".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Split `host[:port]`, also accepting `mqtt://` and bracketed IPv6
///
/// The port is `None` when the broker string does not name one.
pub fn parse_broker(broker: &str) -> Result<(String, Option<u16>), MqttError> {
    let invalid = || MqttError::InvalidBroker(broker.to_string());
    let trimmed = broker.trim();
    let address = trimmed.strip_prefix("mqtt://").unwrap_or(trimmed);

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
        match after {
            "" => (host, None),
            _ => (host, Some(after.strip_prefix(':').ok_or_else(invalid)?)),
        }
    } else {
        match address.split_once(':') {
            Some((host, port)) if !port.contains(':') => (host, Some(port)),
            Some(_) => return Err(invalid()),
            None => (address, None),
        }
    };

    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let port = port
        .map(|port| port.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(invalid))
        .transpose()?;

    Ok((host.to_string(), port))
}

/// Check a topic is publishable
///
/// Publish topics must be non-empty, wildcard-free, NUL-free and fit the
/// 16-bit length prefix.
pub fn validate_topic(topic: &str) -> Result<(), MqttError> {
    let reason = if topic.is_empty() {
        "empty"
    } else if topic.contains(['+', '#']) {
        "wildcards are not allowed when publishing"
    } else if topic.contains('\0') {
        "contains NUL"
    } else if topic.len() > MAX_TOPIC_LEN {
        "longer than 65535 bytes"
    } else {
        return Ok(());
    };

    Err(MqttError::InvalidTopic {
        topic: topic.to_string(),
        reason,
    })
}

/// Connected MQTT client
pub struct MqttConnector {
    client: AsyncClient,
    config: MqttConfig,
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
    driver: JoinHandle<()>,
}

impl MqttConnector {
    /// Connect, retrying per the configuration
    pub async fn connect(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;

        let broker = config.broker();
        let mut reason = String::new();

        for attempt in 1..=config.connect_attempts {
            let (client, mut eventloop) = AsyncClient::new(config.options(), CHANNEL_CAPACITY);

            let outcome =
                tokio::time::timeout(config.connect_timeout, wait_for_connack(&mut eventloop))
                    .await
                    .unwrap_or_else(|_| Err("timed out waiting for ConnAck".to_string()));

            match outcome {
                Ok(()) => {
                    info!("Connected to MQTT broker @ {}", broker);
                    return Ok(Self::start(client, eventloop, config));
                }
                Err(e) => reason = e,
            }

            if attempt < config.connect_attempts {
                warn!(
                    "MQTT connect failed ({}); retrying in {}s, attempt {}/{}",
                    reason,
                    config.retry_delay.as_secs(),
                    attempt,
                    config.connect_attempts
                );
                tokio::time::sleep(config.retry_delay).await;
            }
        }

        Err(MqttError::ConnectFailed {
            broker,
            attempts: config.connect_attempts,
            reason,
        })
    }

    fn start(client: AsyncClient, eventloop: EventLoop, config: MqttConfig) -> Self {
        let connected = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(Mutex::new(ConnectionStats::default()));
        let driver = tokio::spawn(drive(
            eventloop,
            Arc::clone(&connected),
            Arc::clone(&stats),
            config.retry_delay,
        ));

        Self {
            client,
            config,
            connected,
            stats,
            driver,
        }
    }

    /// Configuration this connector was built from
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Send DISCONNECT and stop driving the connection
    pub async fn disconnect(self) -> Result<(), MqttError> {
        let result = self.client.disconnect().await;
        self.driver.abort();
        result.map_err(MqttError::from)
    }
}

impl Drop for MqttConnector {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), String> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(format!("broker refused connection: {:?}", code)),
                };
            }
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }
}

/// Poll the event loop forever, tracking connection state
async fn drive(
    mut eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
    retry_delay: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if !connected.swap(true, Ordering::SeqCst) {
                    lock(&stats).reconnections += 1;
                    info!("Reconnected to MQTT broker");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                warn!("Broker closed the connection");
            }
            Ok(event) => debug!("MQTT {:?}", event),
            Err(e) => {
                if connected.swap(false, Ordering::SeqCst) {
                    warn!("MQTT connection lost: {}", e);
                }
                lock(&stats).last_error = Some(e.to_string());
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MqttConnector {
    type Error = MqttError;

    async fn send(&self, topic: &str, data: &[u8], retain: bool) -> Result<(), Self::Error> {
        validate_topic(topic)?;

        if !self.is_connected() {
            let err = MqttError::NotConnected;
            lock(&self.stats).record_failure(&err);
            return Err(err);
        }

        match self
            .client
            .publish(topic, self.config.qos, retain, data.to_vec())
            .await
        {
            Ok(()) => {
                lock(&self.stats).record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                lock(&self.stats).record_failure(&e);
                Err(MqttError::Client(e))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        lock(&self.stats).clone()
    }
}
