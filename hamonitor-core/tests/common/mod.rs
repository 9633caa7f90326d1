//! Shared helpers for presence integration tests
//!
//! Scenarios are described as runs of constant intensity at a fixed frame
//! rate, which is how a sensor in a room actually behaves: long stretches of
//! nothing, then someone walks in.

#![allow(dead_code)]

use hamonitor_core::time::Timestamp;
use hamonitor_core::{IntensitySample, PresenceEvent, PresenceMachine};

/// Kinect depth stream rate, roughly 30 frames per second
pub const FRAME_MS: u64 = 33;

/// Comfortably above the default threshold
pub const BUSY: u64 = 1_500_000;

/// Sensor noise in an empty room
pub const QUIET: u64 = 20_000;

/// Builds a timestamped sample sequence from runs of constant intensity
pub struct Timeline {
    samples: Vec<IntensitySample>,
    now: Timestamp,
    step: u64,
}

impl Timeline {
    /// Start at `start`, one frame every `step` milliseconds
    pub fn new(start: Timestamp, step: u64) -> Self {
        Self {
            samples: Vec::new(),
            now: start,
            step,
        }
    }

    /// Append frames of `value` covering `duration_ms`
    pub fn hold(mut self, value: u64, duration_ms: u64) -> Self {
        let frames = (duration_ms / self.step).max(1);
        for _ in 0..frames {
            self.samples.push(IntensitySample::new(value, self.now));
            self.now += self.step;
        }
        self
    }

    /// Append a single frame
    pub fn frame(mut self, value: u64) -> Self {
        self.samples.push(IntensitySample::new(value, self.now));
        self.now += self.step;
        self
    }

    /// Timestamp the next frame would get
    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn build(self) -> Vec<IntensitySample> {
        self.samples
    }
}

/// Feed every sample, collecting the events produced
pub fn run(machine: &mut PresenceMachine, samples: &[IntensitySample]) -> Vec<PresenceEvent> {
    samples
        .iter()
        .filter_map(|&sample| machine.feed(sample).ok().flatten())
        .collect()
}

/// Only the state changes out of a list of events
pub fn transitions(events: &[PresenceEvent]) -> Vec<PresenceEvent> {
    events.iter().copied().filter(|e| e.is_transition()).collect()
}
