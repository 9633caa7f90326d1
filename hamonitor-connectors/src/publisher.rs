//! Redundant presence publishing
//!
//! ## Delivery Model
//!
//! Every transition is published twice: once immediately, once after the
//! redundancy delay (30 s by default). There is no acknowledgement protocol
//! on top of MQTT; the duplicate is the only defense against a dropped
//! message.
//!
//! ```text
//!   t=5.0s   MotionStarted ──► "true"
//!   t=35.0s                    "true"   (duplicate)
//!
//!   t=5.0s   MotionStarted ──► "true"
//!   t=20.0s  MotionEnded   ──► "false"  (cancels the "true" duplicate)
//!   t=50.0s                    "false"  (duplicate)
//! ```
//!
//! ## Ordering
//!
//! At most one duplicate is pending per publisher. A new transition aborts
//! the pending task and waits for it to finish before publishing, so a stale
//! "true" can never land after the "false" that replaced it. As a second line,
//! each duplicate checks on wake-up that its transition is still the latest and
//! drops itself otherwise.
//!
//! Re-affirmations (`StillActive`, `StillIdle`) publish once and leave any
//! pending duplicate alone.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hamonitor_core::events::payload_str;
use hamonitor_core::time::Timestamp;
use hamonitor_core::PresenceEvent;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{lock, AsyncConnector};

/// Publish errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// The connector could not publish
    #[error("Publish to {topic} failed: {source}")]
    Transport {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One presence message bound for the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishEvent {
    pub topic: String,
    pub payload: bool,
    /// Sample timestamp of the transition that caused this message
    pub causal_timestamp: Timestamp,
}

impl PublishEvent {
    /// Message announcing `event` on `topic`
    pub fn from_presence(topic: impl Into<String>, event: &PresenceEvent) -> Self {
        Self {
            topic: topic.into(),
            payload: event.payload(),
            causal_timestamp: event.timestamp(),
        }
    }

    /// Wire payload, `"true"` or `"false"`
    pub fn payload_str(&self) -> &'static str {
        payload_str(self.payload)
    }
}

/// Publisher counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublisherStats {
    /// Immediate publishes that succeeded
    pub immediate: u64,
    /// Duplicates that fired and succeeded
    pub duplicates_sent: u64,
    /// Duplicates cancelled by a newer transition
    pub duplicates_superseded: u64,
    /// Duplicates that woke up to find a newer transition
    pub duplicates_stale: u64,
    /// Publishes that failed, immediate or duplicate
    pub failures: u64,
}

/// Publishes presence events with one delayed duplicate per transition
pub struct ReliablePublisher<C> {
    connector: Arc<C>,
    topic: String,
    redundancy_delay: Duration,
    /// The one pending duplicate
    pending: Option<JoinHandle<()>>,
    /// Causal timestamp of the latest transition
    latest: watch::Sender<Option<Timestamp>>,
    stats: Arc<Mutex<PublisherStats>>,
}

impl<C> ReliablePublisher<C>
where
    C: AsyncConnector + 'static,
{
    /// Publish on `topic` through `connector`
    pub fn new(connector: Arc<C>, topic: impl Into<String>, redundancy_delay: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            connector,
            topic: topic.into(),
            redundancy_delay,
            pending: None,
            latest,
            stats: Arc::new(Mutex::new(PublisherStats::default())),
        }
    }

    /// Topic presence is published on
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Delay before a transition is repeated
    pub fn redundancy_delay(&self) -> Duration {
        self.redundancy_delay
    }

    /// Whether a duplicate is scheduled and has not fired yet
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Get statistics
    pub fn stats(&self) -> PublisherStats {
        *lock(&self.stats)
    }

    /// Publish whatever `event` calls for
    ///
    /// For a transition the duplicate is scheduled even when the immediate
    /// publish fails; the error is still returned so the caller can log it.
    pub async fn on_event(&mut self, event: &PresenceEvent) -> Result<(), PublishError> {
        let message = PublishEvent::from_presence(self.topic.as_str(), event);

        if !event.is_transition() {
            debug!("Re-affirming {} on {}", message.payload_str(), message.topic);
            return self.publish_now(&message).await;
        }

        self.cancel_pending().await;
        self.latest.send_replace(Some(message.causal_timestamp));

        let result = self.publish_now(&message).await;
        self.schedule_duplicate(message);
        result
    }

    /// Cancel any pending duplicate
    pub async fn shutdown(&mut self) {
        self.cancel_pending().await;
    }

    async fn publish_now(&self, message: &PublishEvent) -> Result<(), PublishError> {
        let payload = message.payload_str();
        match self
            .connector
            .send(&message.topic, payload.as_bytes(), false)
            .await
        {
            Ok(()) => {
                lock(&self.stats).immediate += 1;
                info!("Published {} to {}", payload, message.topic);
                Ok(())
            }
            Err(e) => {
                lock(&self.stats).failures += 1;
                Err(PublishError::Transport {
                    topic: message.topic.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Abort the pending duplicate and wait until it can no longer fire
    async fn cancel_pending(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };

        if task.is_finished() {
            let _ = task.await;
            return;
        }

        task.abort();
        match task.await {
            Err(e) if e.is_cancelled() => {
                lock(&self.stats).duplicates_superseded += 1;
                debug!("Superseded pending duplicate on {}", self.topic);
            }
            Err(e) => warn!("Duplicate publish task failed: {}", e),
            Ok(()) => {}
        }
    }

    fn schedule_duplicate(&mut self, message: PublishEvent) {
        let connector = Arc::clone(&self.connector);
        let stats = Arc::clone(&self.stats);
        let latest = self.latest.subscribe();
        let delay = self.redundancy_delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let current = *latest.borrow();
            if current != Some(message.causal_timestamp) {
                lock(&stats).duplicates_stale += 1;
                debug!(
                    "Dropping stale duplicate from {}ms (latest {:?})",
                    message.causal_timestamp, current
                );
                return;
            }

            let payload = message.payload_str();
            match connector.send(&message.topic, payload.as_bytes(), false).await {
                Ok(()) => {
                    lock(&stats).duplicates_sent += 1;
                    info!("Re-published {} to {}", payload, message.topic);
                }
                Err(e) => {
                    lock(&stats).failures += 1;
                    warn!("Redundant publish to {} failed: {}", message.topic, e);
                }
            }
        }));
    }
}

impl<C> Drop for ReliablePublisher<C> {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
