//! One pipeline run: samples in, presence messages out
//!
//! ```text
//!  source ──► mpsc ──► PresenceMachine ──► ReliablePublisher ──► connector
//!  (blocking thread)    (owned, no locks)   (one pending duplicate)
//! ```
//!
//! A run ends when the source does, or fails. Rejected samples and failed
//! publishes are logged and the run carries on.

use std::sync::Arc;
use std::time::Duration;

use hamonitor_connectors::{AsyncConnector, MqttError, PublisherStats, ReliablePublisher};
use hamonitor_core::{
    ConfigError, IntensitySample, MachineStats, PresenceConfig, PresenceEvent, PresenceMachine,
};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::source::SourceError;

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Broker unavailable: {0}")]
    Mqtt(#[from] MqttError),

    #[error("Invalid presence configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(SourceError),

    #[error("Sample source ended")]
    SourceEnded,
}

impl From<SourceError> for PipelineError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Ended => Self::SourceEnded,
            other => Self::Source(other),
        }
    }
}

/// State machine plus publisher for one run
pub struct Pipeline<C> {
    machine: PresenceMachine,
    publisher: ReliablePublisher<C>,
    publish_failures: u64,
}

impl<C> Pipeline<C>
where
    C: AsyncConnector + 'static,
{
    /// Build a pipeline publishing to `topic` through `connector`
    pub fn new(
        config: PresenceConfig,
        connector: Arc<C>,
        topic: &str,
        redundancy_delay: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            machine: PresenceMachine::try_new(config)?,
            publisher: ReliablePublisher::new(connector, topic, redundancy_delay),
            publish_failures: 0,
        })
    }

    /// Feed one sample and publish whatever it caused
    pub async fn handle(&mut self, sample: IntensitySample) -> Option<PresenceEvent> {
        let event = match self.machine.feed(sample) {
            Ok(Some(event)) => event,
            Ok(None) => return None,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        if let Err(e) = self.publisher.on_event(&event).await {
            self.publish_failures += 1;
            warn!("{}", e);
        }
        Some(event)
    }

    /// Consume samples until the source ends or fails
    pub async fn run(
        mut self,
        mut samples: mpsc::Receiver<Result<IntensitySample, SourceError>>,
    ) -> Result<(), PipelineError> {
        info!(
            "Watching for motion (threshold {}, state {})",
            self.machine.threshold(),
            self.machine.state()
        );

        let result = loop {
            match samples.recv().await {
                Some(Ok(sample)) => {
                    debug!("Sample {} at {}ms", sample.value, sample.timestamp);
                    self.handle(sample).await;
                }
                Some(Err(e)) => break Err(PipelineError::from(e)),
                None => break Err(PipelineError::SourceEnded),
            }
        };

        self.publisher.shutdown().await;
        let machine = self.machine.stats();
        info!(
            "Run over: {} samples, {} transitions, {} stale, {} failed publishes",
            machine.samples, machine.transitions, machine.stale_samples, self.publish_failures
        );
        result
    }

    /// The state machine
    pub fn machine(&self) -> &PresenceMachine {
        &self.machine
    }

    /// State machine counters
    pub fn machine_stats(&self) -> MachineStats {
        *self.machine.stats()
    }

    /// Publisher counters
    pub fn publisher_stats(&self) -> PublisherStats {
        self.publisher.stats()
    }

    /// Publishes that returned an error
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures
    }
}
