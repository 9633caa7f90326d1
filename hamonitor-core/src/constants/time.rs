//! Time-Related Constants
//!
//! Timer defaults for presence detection and delivery, all in milliseconds
//! to match [`Timestamp`](crate::time::Timestamp).

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Milliseconds per minute.
pub const MS_PER_MINUTE: u64 = MS_PER_SECOND * SECONDS_PER_MINUTE;

// ===== PRESENCE TIMERS =====

/// Continuous activity required before presence is asserted (milliseconds).
///
/// Five seconds filters out pets walking past, curtains and sensor noise
/// while still reacting before someone has crossed the room.
pub const DEFAULT_DEBOUNCE_MS: u64 = 5 * MS_PER_SECOND;

/// Continuous inactivity required before presence is retracted (milliseconds).
///
/// Four minutes. People sitting still (reading, watching TV) produce very
/// little depth change, so the cooldown is long.
pub const DEFAULT_COOLDOWN_MS: u64 = 4 * MS_PER_MINUTE;

/// Delay before the redundant copy of a transition is published (milliseconds).
pub const DEFAULT_REDUNDANCY_DELAY_MS: u64 = 30 * MS_PER_SECOND;

// ===== RUNLOOP PROFILE =====

/// Averaging window for the runloop profile (milliseconds).
///
/// Frames are averaged over this window and evaluated once per window.
pub const RUNLOOP_AVERAGING_WINDOW_MS: u64 = 5 * MS_PER_SECOND;

/// Re-affirmation interval for the runloop profile (milliseconds).
pub const RUNLOOP_REAFFIRM_INTERVAL_MS: u64 = 5 * MS_PER_SECOND;

/// Quiet windows in a row that end presence in the runloop profile.
pub const RUNLOOP_QUIET_WINDOWS: u64 = 30;

/// Cooldown for the runloop profile (milliseconds): 30 quiet windows, 150 s.
pub const RUNLOOP_COOLDOWN_MS: u64 = RUNLOOP_QUIET_WINDOWS * RUNLOOP_AVERAGING_WINDOW_MS;

// ===== SUPERVISION =====

/// Pause between a pipeline crash and its restart (milliseconds).
pub const RESTART_BACKOFF_MS: u64 = 5 * MS_PER_SECOND;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered() {
        assert!(DEFAULT_DEBOUNCE_MS < DEFAULT_REDUNDANCY_DELAY_MS);
        assert!(DEFAULT_REDUNDANCY_DELAY_MS < DEFAULT_COOLDOWN_MS);
        assert_eq!(DEFAULT_COOLDOWN_MS, 240_000);
        assert_eq!(RUNLOOP_COOLDOWN_MS, 150_000);
        assert!(RUNLOOP_COOLDOWN_MS < DEFAULT_COOLDOWN_MS);
    }
}
