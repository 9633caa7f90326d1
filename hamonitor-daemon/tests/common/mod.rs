//! Shared helpers for daemon integration tests

#![allow(dead_code)]

use std::time::Duration;

use hamonitor_core::IntensitySample;
use hamonitor_daemon::source::SourceError;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use hamonitor_connectors::memory::SentMessage;

pub type SampleSender = mpsc::Sender<Result<IntensitySample, SourceError>>;
pub type SampleReceiver = mpsc::Receiver<Result<IntensitySample, SourceError>>;

/// Channel shaped like the one the source pump feeds
pub fn channel() -> (SampleSender, SampleReceiver) {
    mpsc::channel(64)
}

/// Send `count` samples of `value`, one every `step_ms`, in real (paused) time
///
/// Sample timestamps are milliseconds since `origin`, so they line up with
/// the runtime clock the publisher schedules duplicates on.
pub async fn play(tx: &SampleSender, origin: Instant, value: u64, count: usize, step_ms: u64) {
    for _ in 0..count {
        let at = (Instant::now() - origin).as_millis() as u64;
        if tx.send(Ok(IntensitySample::new(value, at))).await.is_err() {
            return;
        }
        sleep(Duration::from_millis(step_ms)).await;
    }
}

/// `(payload, tenths of a second since origin)` for each message
pub fn timeline(messages: &[SentMessage], origin: Instant) -> Vec<(String, u64)> {
    messages
        .iter()
        .map(|m| (m.payload_str(), ((m.sent_at - origin).as_millis() / 100) as u64))
        .collect()
}

pub fn at(payload: &str, tenths: u64) -> (String, u64) {
    (payload.to_string(), tenths)
}
