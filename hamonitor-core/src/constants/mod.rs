//! Constants for HAMonitor Core
//!
//! Centralised, documented defaults. Everything here can be overridden through
//! [`PresenceConfig`](crate::PresenceConfig); these are the values used when
//! nothing else is said.
//!
//! ## Organization
//!
//! - **Time**: timer windows and delays, in milliseconds
//! - **Presence**: intensity scale and default thresholds

/// Timer windows, delays and backoff.
pub mod time;

/// Intensity scale and default thresholds.
pub mod presence;

pub use presence::{ONESHOT_THRESHOLD, RUNLOOP_THRESHOLD};

pub use time::{
    DEFAULT_COOLDOWN_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_REDUNDANCY_DELAY_MS, MS_PER_SECOND,
    RESTART_BACKOFF_MS, RUNLOOP_AVERAGING_WINDOW_MS, RUNLOOP_COOLDOWN_MS,
    RUNLOOP_QUIET_WINDOWS, RUNLOOP_REAFFIRM_INTERVAL_MS,
};
