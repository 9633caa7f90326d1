//! Home Assistant MQTT discovery
//!
//! Publishing a retained config message under
//! `homeassistant/binary_sensor/<object_id>/config` makes Home Assistant create
//! the motion sensor on its own. The payload mirrors the presence wire format:
//! `"true"` is on, `"false"` is off.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hamonitor_core::events::payload_str;

use crate::AsyncConnector;

/// Discovery topic prefix Home Assistant listens on
pub const DISCOVERY_PREFIX: &str = "homeassistant";

/// Default object id under the prefix
pub const DEFAULT_OBJECT_ID: &str = "kinect_motion";

/// Discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Could not encode discovery config: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Could not publish discovery config: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Device block grouping entities in Home Assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDevice {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl Default for DiscoveryDevice {
    fn default() -> Self {
        Self {
            identifiers: vec!["kinect_hamonitor".to_string()],
            name: "Kinect HAMonitor".to_string(),
            manufacturer: "OpenKinect".to_string(),
            model: "Xbox 360 Kinect".to_string(),
        }
    }
}

/// Binary sensor discovery config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub name: String,
    pub state_topic: String,
    pub device_class: String,
    pub payload_on: String,
    pub payload_off: String,
    pub unique_id: String,
    pub device: DiscoveryDevice,
}

impl DiscoveryConfig {
    /// Motion sensor reading presence from `state_topic`
    pub fn motion_sensor(state_topic: impl Into<String>) -> Self {
        Self {
            name: "Kinect Motion".to_string(),
            state_topic: state_topic.into(),
            device_class: "motion".to_string(),
            payload_on: payload_str(true).to_string(),
            payload_off: payload_str(false).to_string(),
            unique_id: "kinect_motion_01".to_string(),
            device: DiscoveryDevice::default(),
        }
    }

    /// Set the entity name shown in Home Assistant
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the unique id, needed when running more than one sensor
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = unique_id.into();
        self
    }

    /// Encode as the JSON payload
    pub fn to_json(&self) -> Result<Vec<u8>, DiscoveryError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Topic the config for `object_id` is published on
pub fn discovery_topic(object_id: &str) -> String {
    format!("{}/binary_sensor/{}/config", DISCOVERY_PREFIX, object_id)
}

/// Publish `config` as a retained discovery message
pub async fn announce<C>(
    connector: &C,
    object_id: &str,
    config: &DiscoveryConfig,
) -> Result<(), DiscoveryError>
where
    C: AsyncConnector + ?Sized,
{
    let topic = discovery_topic(object_id);
    let payload = config.to_json()?;

    connector
        .send(&topic, &payload, true)
        .await
        .map_err(|e| DiscoveryError::Transport(Box::new(e)))?;

    log::info!("Published Home Assistant discovery to {}", topic);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;

    #[test]
    fn payload_matches_home_assistant_schema() {
        let config = DiscoveryConfig::motion_sensor("kinect/motion");
        let value: serde_json::Value = serde_json::from_slice(&config.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "name": "Kinect Motion",
                "state_topic": "kinect/motion",
                "device_class": "motion",
                "payload_on": "true",
                "payload_off": "false",
                "unique_id": "kinect_motion_01",
                "device": {
                    "identifiers": ["kinect_hamonitor"],
                    "name": "Kinect HAMonitor",
                    "manufacturer": "OpenKinect",
                    "model": "Xbox 360 Kinect"
                }
            })
        );
    }

    #[test]
    fn topic_layout() {
        assert_eq!(
            discovery_topic(DEFAULT_OBJECT_ID),
            "homeassistant/binary_sensor/kinect_motion/config"
        );
    }

    #[tokio::test]
    async fn announce_is_retained() {
        let connector = MemoryConnector::new();
        let config = DiscoveryConfig::motion_sensor("den/motion").with_unique_id("den_01");

        announce(&connector, "den_motion", &config).await.unwrap();

        let messages = connector.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "homeassistant/binary_sensor/den_motion/config");
        assert!(messages[0].retain);

        let decoded: DiscoveryConfig = serde_json::from_slice(&messages[0].payload).unwrap();
        assert_eq!(decoded, config);
    }

    #[tokio::test]
    async fn announce_surfaces_transport_errors() {
        let connector = MemoryConnector::new();
        connector.set_online(false);

        let config = DiscoveryConfig::motion_sensor("kinect/motion");
        assert!(matches!(
            announce(&connector, DEFAULT_OBJECT_ID, &config).await,
            Err(DiscoveryError::Transport(_))
        ));
    }
}
