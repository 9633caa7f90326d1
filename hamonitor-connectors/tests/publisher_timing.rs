//! Redundant publishing on a paused clock
//!
//! Time only moves when every task is idle, so a 30 s redundancy delay costs
//! nothing to test and the recorded send times are exact.

use std::sync::Arc;
use std::time::Duration;

use hamonitor_connectors::memory::{MemoryConnector, SentMessage};
use hamonitor_connectors::{PublishError, ReliablePublisher, DEFAULT_TOPIC};
use hamonitor_core::PresenceEvent;
use tokio::time::{sleep, Instant};

const REDUNDANCY: Duration = Duration::from_secs(30);

fn setup() -> (Arc<MemoryConnector>, ReliablePublisher<MemoryConnector>) {
    let connector = Arc::new(MemoryConnector::new());
    let publisher = ReliablePublisher::new(Arc::clone(&connector), DEFAULT_TOPIC, REDUNDANCY);
    (connector, publisher)
}

/// `(payload, seconds since start)` for each message, rounded to 0.1 s
fn timeline(messages: &[SentMessage], start: Instant) -> Vec<(String, u64)> {
    messages
        .iter()
        .map(|m| {
            let tenths = (m.sent_at - start).as_millis() / 100;
            (m.payload_str(), tenths as u64)
        })
        .collect()
}

fn at(payload: &str, tenths: u64) -> (String, u64) {
    (payload.to_string(), tenths)
}

#[tokio::test(start_paused = true)]
async fn transition_is_published_twice() {
    let (connector, mut publisher) = setup();
    let start = Instant::now();

    sleep(Duration::from_secs(5)).await;
    publisher
        .on_event(&PresenceEvent::MotionStarted { at: 5_000 })
        .await
        .unwrap();

    sleep(Duration::from_secs(60)).await;

    assert_eq!(
        timeline(&connector.messages(), start),
        vec![at("true", 50), at("true", 350)]
    );
    assert!(connector
        .messages()
        .iter()
        .all(|m| m.topic == DEFAULT_TOPIC && !m.retain));

    let stats = publisher.stats();
    assert_eq!(stats.immediate, 1);
    assert_eq!(stats.duplicates_sent, 1);
    assert_eq!(stats.duplicates_superseded, 0);
}

#[tokio::test(start_paused = true)]
async fn newer_transition_supersedes_pending_duplicate() {
    let (connector, mut publisher) = setup();
    let start = Instant::now();

    publisher
        .on_event(&PresenceEvent::MotionStarted { at: 0 })
        .await
        .unwrap();
    sleep(Duration::from_secs(10)).await;
    publisher
        .on_event(&PresenceEvent::MotionEnded { at: 10_000 })
        .await
        .unwrap();
    sleep(Duration::from_secs(60)).await;

    // The "true" duplicate due at 30 s never fires
    assert_eq!(
        timeline(&connector.messages(), start),
        vec![at("true", 0), at("false", 100), at("false", 400)]
    );
    assert_eq!(publisher.stats().duplicates_superseded, 1);
    assert_eq!(publisher.stats().duplicates_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn cooldown_end_scenario() {
    let (connector, mut publisher) = setup();
    let start = Instant::now();

    // Presence ended 4 min 0.1 s into the quiet stretch
    sleep(Duration::from_millis(240_100)).await;
    publisher
        .on_event(&PresenceEvent::MotionEnded { at: 240_100 })
        .await
        .unwrap();
    sleep(Duration::from_secs(31)).await;

    assert_eq!(
        timeline(&connector.messages(), start),
        vec![at("false", 2_401), at("false", 2_701)]
    );
}

#[tokio::test(start_paused = true)]
async fn reaffirmation_publishes_once_and_keeps_duplicate() {
    let (connector, mut publisher) = setup();
    let start = Instant::now();

    publisher
        .on_event(&PresenceEvent::MotionStarted { at: 0 })
        .await
        .unwrap();
    sleep(Duration::from_secs(5)).await;
    publisher
        .on_event(&PresenceEvent::StillActive { at: 5_000 })
        .await
        .unwrap();
    assert!(publisher.has_pending());

    sleep(Duration::from_secs(60)).await;

    assert_eq!(
        timeline(&connector.messages(), start),
        vec![at("true", 0), at("true", 50), at("true", 300)]
    );
    assert_eq!(publisher.stats().immediate, 2);
    assert_eq!(publisher.stats().duplicates_superseded, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_publish_still_schedules_duplicate() {
    let (connector, mut publisher) = setup();
    let start = Instant::now();

    connector.set_online(false);
    let result = publisher
        .on_event(&PresenceEvent::MotionStarted { at: 0 })
        .await;
    assert!(matches!(result, Err(PublishError::Transport { .. })));
    assert!(publisher.has_pending());

    connector.set_online(true);
    sleep(Duration::from_secs(31)).await;

    // The duplicate is the only copy that got through
    assert_eq!(timeline(&connector.messages(), start), vec![at("true", 300)]);
    assert_eq!(publisher.stats().failures, 1);
    assert_eq!(publisher.stats().duplicates_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_flapping_sends_only_latest_duplicate() {
    let (connector, mut publisher) = setup();

    let events = [
        PresenceEvent::MotionStarted { at: 0 },
        PresenceEvent::MotionEnded { at: 1_000 },
        PresenceEvent::MotionStarted { at: 2_000 },
        PresenceEvent::MotionEnded { at: 3_000 },
    ];
    for event in &events {
        publisher.on_event(event).await.unwrap();
        sleep(Duration::from_secs(1)).await;
    }
    sleep(Duration::from_secs(60)).await;

    assert_eq!(
        connector.payloads(),
        vec!["true", "false", "true", "false", "false"]
    );
    let stats = publisher.stats();
    assert_eq!(stats.duplicates_superseded, 3);
    assert_eq!(stats.duplicates_sent, 1);
}
