//! Presence Detection State Machine
//!
//! ## Overview
//!
//! Converts per-frame intensity samples into stable presence transitions.
//! Three states, strictly cyclic:
//!
//! ```text
//!              active                active, held >= debounce
//!   ┌──────┐ ─────────► ┌────────────┐ ─────────────────────► ┌────────┐
//!   │ Idle │            │ Debouncing │                        │ Active │
//!   └──────┘ ◄───────── └────────────┘                        └────────┘
//!      ▲      inactive                                            │
//!      └──────────────────────────────────────────────────────────┘
//!                       inactive, held >= cooldown
//! ```
//!
//! ## Asymmetry
//!
//! The machine is biased against false positives:
//!
//! - **Debounce** needs *continuous* activity. One quiet frame during
//!   `Debouncing` drops straight back to `Idle` with no partial credit.
//! - **Cooldown** needs *continuous* inactivity. One active frame during
//!   `Active` zeroes the inactivity timer.
//!
//! Nobody gets switched on by a flicker, and nobody sitting still gets
//! switched off while they so much as turn a page.
//!
//! ## Timing
//!
//! Timers are differences between sample timestamps, never readings of a
//! clock. A sample whose timestamp does not advance is rejected with
//! [`PresenceError::StaleSample`] before it can touch any timer.

use core::fmt;

use crate::config::PresenceConfig;
use crate::errors::{ConfigError, PresenceError, PresenceResult};
use crate::events::PresenceEvent;
use crate::sample::{IntensitySample, Threshold};
use crate::time::{elapsed_ms, Timestamp};

/// Presence state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresenceState {
    /// No recent activity, presence not asserted
    #[default]
    Idle,
    /// Activity seen, not yet continuous for the debounce window
    Debouncing,
    /// Presence asserted
    Active,
}

impl PresenceState {
    /// Presence value published for this state
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Lower-case name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Debouncing => "debouncing",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PresenceState {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

/// Sample counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MachineStats {
    /// Samples accepted
    pub samples: u64,
    /// Accepted samples above threshold
    pub active_samples: u64,
    /// Samples rejected as stale
    pub stale_samples: u64,
    /// Transitions emitted
    pub transitions: u64,
    /// Re-affirmations emitted
    pub reaffirmations: u64,
}

/// The presence state machine
///
/// Owns the one `PresenceState` of a pipeline and the two timers behind it.
///
/// ```
/// use hamonitor_core::{IntensitySample, PresenceConfig, PresenceMachine, PresenceState};
///
/// let mut machine = PresenceMachine::new(PresenceConfig::default().with_threshold(100));
///
/// machine.feed(IntensitySample::new(500, 0)).unwrap();
/// assert_eq!(machine.state(), PresenceState::Debouncing);
///
/// // One quiet frame cancels the debounce
/// machine.feed(IntensitySample::new(50, 100)).unwrap();
/// assert_eq!(machine.state(), PresenceState::Idle);
/// ```
#[derive(Debug, Clone)]
pub struct PresenceMachine {
    threshold: Threshold,
    debounce_ms: u64,
    cooldown_ms: u64,
    reaffirm_ms: Option<u64>,

    state: PresenceState,
    /// Timestamp of the last accepted sample
    last_seen: Option<Timestamp>,
    /// First active frame of the current debounce run
    activity_since: Option<Timestamp>,
    /// Continuous inactivity accumulated while `Active`
    inactive_ms: u64,
    /// Last transition or re-affirmation
    last_affirmed: Option<Timestamp>,

    stats: MachineStats,
}

impl PresenceMachine {
    /// Create a machine in `Idle`
    ///
    /// The configuration is trusted; use [`PresenceMachine::try_new`] for
    /// values that came from a user.
    pub fn new(config: PresenceConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid presence config");

        Self {
            threshold: config.threshold,
            debounce_ms: config.debounce_ms(),
            cooldown_ms: config.cooldown_ms(),
            reaffirm_ms: config.reaffirm_ms(),
            state: PresenceState::Idle,
            last_seen: None,
            activity_since: None,
            inactive_ms: 0,
            last_affirmed: None,
            stats: MachineStats::default(),
        }
    }

    /// Validate `config` and create a machine in `Idle`
    pub fn try_new(config: PresenceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Current state
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Threshold in use
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Timestamp of the last accepted sample
    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }

    /// Continuous activity so far in the current debounce run
    pub fn activity_ms(&self) -> u64 {
        match (self.activity_since, self.last_seen) {
            (Some(since), Some(last)) => elapsed_ms(since, last),
            _ => 0,
        }
    }

    /// Continuous inactivity so far while `Active`
    pub fn inactivity_ms(&self) -> u64 {
        self.inactive_ms
    }

    /// Counters
    pub fn stats(&self) -> &MachineStats {
        &self.stats
    }

    /// Back to `Idle` with all timers cleared, as after a restart
    pub fn reset(&mut self) {
        self.state = PresenceState::Idle;
        self.last_seen = None;
        self.activity_since = None;
        self.inactive_ms = 0;
        self.last_affirmed = None;
    }

    /// Feed one sample
    ///
    /// Returns the event this sample caused, if any. Stale samples are
    /// rejected without any change to state or timers.
    pub fn feed(&mut self, sample: IntensitySample) -> PresenceResult<Option<PresenceEvent>> {
        let now = sample.timestamp;

        let elapsed = match self.last_seen {
            Some(last) if now <= last => {
                self.stats.stale_samples += 1;
                log_warn!("Rejected stale sample at {}ms (last {}ms)", now, last);
                return Err(PresenceError::StaleSample {
                    timestamp: now,
                    last_seen: last,
                });
            }
            Some(last) => now - last,
            None => 0,
        };

        self.last_seen = Some(now);
        self.stats.samples += 1;
        if self.last_affirmed.is_none() {
            self.last_affirmed = Some(now);
        }

        let active = sample.is_active(self.threshold);
        if active {
            self.stats.active_samples += 1;
        }

        let event = match (self.state, active) {
            (PresenceState::Idle, true) => {
                self.state = PresenceState::Debouncing;
                self.activity_since = Some(now);
                log_debug!("Activity at {}ms ({}), debouncing", now, sample.value);
                None
            }

            (PresenceState::Idle, false) => self.reaffirm(now, PresenceEvent::StillIdle { at: now }),

            (PresenceState::Debouncing, true) => {
                let since = self.activity_since.unwrap_or(now);
                if elapsed_ms(since, now) >= self.debounce_ms {
                    self.state = PresenceState::Active;
                    self.activity_since = None;
                    self.inactive_ms = 0;
                    Some(self.transition(PresenceEvent::MotionStarted { at: now }))
                } else {
                    None
                }
            }

            (PresenceState::Debouncing, false) => {
                log_debug!(
                    "Quiet frame at {}ms after {}ms of activity, back to idle",
                    now,
                    self.activity_ms()
                );
                self.state = PresenceState::Idle;
                self.activity_since = None;
                None
            }

            (PresenceState::Active, true) => {
                self.inactive_ms = 0;
                self.reaffirm(now, PresenceEvent::StillActive { at: now })
            }

            (PresenceState::Active, false) => {
                self.inactive_ms = self.inactive_ms.saturating_add(elapsed);
                if self.inactive_ms >= self.cooldown_ms {
                    self.state = PresenceState::Idle;
                    self.inactive_ms = 0;
                    Some(self.transition(PresenceEvent::MotionEnded { at: now }))
                } else {
                    None
                }
            }
        };

        Ok(event)
    }

    fn transition(&mut self, event: PresenceEvent) -> PresenceEvent {
        self.last_affirmed = Some(event.timestamp());
        self.stats.transitions += 1;
        log_info!("{}", event);
        event
    }

    fn reaffirm(&mut self, now: Timestamp, event: PresenceEvent) -> Option<PresenceEvent> {
        let interval = self.reaffirm_ms?;
        let since = self.last_affirmed.unwrap_or(now);
        if elapsed_ms(since, now) < interval {
            return None;
        }

        self.last_affirmed = Some(now);
        self.stats.reaffirmations += 1;
        log_debug!("{}", event);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    const THRESHOLD: u64 = 1_000_000;
    const HIGH: u64 = 1_200_000;
    const LOW: u64 = 900_000;

    fn machine() -> PresenceMachine {
        PresenceMachine::new(PresenceConfig::default().with_threshold(THRESHOLD))
    }

    fn feed(machine: &mut PresenceMachine, value: u64, at: Timestamp) -> Option<PresenceEvent> {
        machine.feed(IntensitySample::new(value, at)).unwrap()
    }

    /// Drive a machine into `Active`, returning the timestamp it got there
    fn activate(machine: &mut PresenceMachine) -> Timestamp {
        let mut at = 0;
        loop {
            if let Some(PresenceEvent::MotionStarted { at }) = feed(machine, HIGH, at) {
                return at;
            }
            at += 100;
        }
    }

    #[test]
    fn starts_idle() {
        let machine = machine();
        assert_eq!(machine.state(), PresenceState::Idle);
        assert_eq!(machine.last_seen(), None);
        assert!(!machine.state().is_present());
    }

    #[test]
    fn idle_ignores_quiet_frames() {
        let mut machine = machine();
        for i in 0..50 {
            assert_eq!(feed(&mut machine, LOW, i * 100), None);
        }
        assert_eq!(machine.state(), PresenceState::Idle);
    }

    #[test]
    fn first_active_frame_enters_debouncing() {
        let mut machine = machine();
        assert_eq!(feed(&mut machine, HIGH, 0), None);
        assert_eq!(machine.state(), PresenceState::Debouncing);
    }

    #[test]
    fn debounce_completes_at_window() {
        let mut machine = machine();
        for at in (0..5_000).step_by(100) {
            assert_eq!(feed(&mut machine, HIGH, at), None, "early start at {}", at);
        }
        assert_eq!(machine.activity_ms(), 4_900);
        assert_eq!(
            feed(&mut machine, HIGH, 5_000),
            Some(PresenceEvent::MotionStarted { at: 5_000 })
        );
        assert_eq!(machine.state(), PresenceState::Active);
    }

    #[test]
    fn single_quiet_frame_cancels_debounce() {
        let mut machine = machine();
        for at in (0..4_900).step_by(100) {
            feed(&mut machine, HIGH, at);
        }
        feed(&mut machine, LOW, 4_900);
        assert_eq!(machine.state(), PresenceState::Idle);
        assert_eq!(machine.activity_ms(), 0);

        // No partial credit: the window restarts from the next active frame
        assert_eq!(feed(&mut machine, HIGH, 5_000), None);
        assert_eq!(feed(&mut machine, HIGH, 9_900), None);
        assert_eq!(
            feed(&mut machine, HIGH, 10_000),
            Some(PresenceEvent::MotionStarted { at: 10_000 })
        );
    }

    #[test]
    fn cooldown_ends_presence() {
        let mut machine = machine();
        let start = activate(&mut machine);

        let mut ended = None;
        let mut at = start;
        while ended.is_none() {
            at += 100;
            ended = feed(&mut machine, LOW, at);
        }
        assert_eq!(ended, Some(PresenceEvent::MotionEnded { at: start + 240_000 }));
        assert_eq!(machine.state(), PresenceState::Idle);
    }

    #[test]
    fn one_active_frame_resets_cooldown() {
        let mut machine = machine();
        let start = activate(&mut machine);

        for at in (start + 1_000..start + 239_000).step_by(1_000) {
            assert_eq!(feed(&mut machine, LOW, at), None);
        }
        // 3:59 after the last activity
        assert_eq!(feed(&mut machine, HIGH, start + 239_000), None);
        assert_eq!(machine.inactivity_ms(), 0);
        assert_eq!(feed(&mut machine, LOW, start + 240_000), None);
        assert_eq!(machine.state(), PresenceState::Active);
    }

    #[test]
    fn stale_samples_change_nothing() {
        let mut machine = machine();
        feed(&mut machine, HIGH, 1_000);
        feed(&mut machine, HIGH, 2_000);
        let before = (machine.state(), machine.activity_ms(), machine.last_seen());

        let err = machine.feed(IntensitySample::new(LOW, 2_000)).unwrap_err();
        assert_eq!(err, PresenceError::StaleSample { timestamp: 2_000, last_seen: 2_000 });
        assert!(machine.feed(IntensitySample::new(LOW, 1_500)).is_err());

        assert_eq!(before, (machine.state(), machine.activity_ms(), machine.last_seen()));
        assert_eq!(machine.stats().stale_samples, 2);
        assert_eq!(machine.stats().samples, 2);
    }

    #[test]
    fn zero_debounce_still_passes_through_debouncing() {
        let mut machine = PresenceMachine::new(
            PresenceConfig::default()
                .with_threshold(THRESHOLD)
                .with_debounce(Duration::ZERO),
        );
        assert_eq!(feed(&mut machine, HIGH, 0), None);
        assert_eq!(machine.state(), PresenceState::Debouncing);
        assert_eq!(
            feed(&mut machine, HIGH, 1),
            Some(PresenceEvent::MotionStarted { at: 1 })
        );
    }

    #[test]
    fn reaffirmations_when_enabled() {
        let mut machine = PresenceMachine::new(
            PresenceConfig::default()
                .with_threshold(THRESHOLD)
                .with_reaffirm_interval(Some(Duration::from_secs(5))),
        );

        assert_eq!(feed(&mut machine, LOW, 0), None);
        assert_eq!(feed(&mut machine, LOW, 4_000), None);
        assert_eq!(
            feed(&mut machine, LOW, 5_000),
            Some(PresenceEvent::StillIdle { at: 5_000 })
        );

        let started = (6_000..=11_000)
            .step_by(1_000)
            .filter_map(|at| feed(&mut machine, HIGH, at))
            .collect::<heapless::Vec<_, 4>>();
        assert_eq!(started.as_slice(), &[PresenceEvent::MotionStarted { at: 11_000 }]);

        // Interval restarts at the transition
        assert_eq!(feed(&mut machine, HIGH, 15_000), None);
        assert_eq!(
            feed(&mut machine, HIGH, 16_000),
            Some(PresenceEvent::StillActive { at: 16_000 })
        );
        assert_eq!(machine.stats().reaffirmations, 2);
        assert_eq!(machine.stats().transitions, 1);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut machine = machine();
        activate(&mut machine);
        machine.reset();
        assert_eq!(machine.state(), PresenceState::Idle);
        assert_eq!(machine.last_seen(), None);
        // Old timestamps are acceptable again after a reset
        assert_eq!(feed(&mut machine, HIGH, 0), None);
    }

    #[test]
    fn try_new_rejects_bad_config() {
        let config = PresenceConfig::default().with_cooldown(Duration::ZERO);
        assert_eq!(PresenceMachine::try_new(config).unwrap_err(), ConfigError::ZeroCooldown);
    }
}
