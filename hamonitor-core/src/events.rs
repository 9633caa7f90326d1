//! Presence Events
//!
//! ## Overview
//!
//! The state machine speaks in two kinds of events:
//!
//! - **Transitions** (`MotionStarted`, `MotionEnded`): presence changed. These
//!   are the messages home automation reacts to, and the publisher guards each
//!   one with a delayed duplicate.
//! - **Re-affirmations** (`StillActive`, `StillIdle`): nothing changed, but the
//!   current state is repeated so a consumer that missed the transition (or
//!   restarted) converges. Only emitted when an interval is configured.
//!
//! ```text
//!            MotionStarted                MotionEnded
//!   Idle ──────────────────────► Active ──────────────► Idle
//!    │ StillIdle                   │ StillActive
//!    └──────┘                      └──────┘
//! ```
//!
//! Every event carries the timestamp of the sample that caused it. The
//! publisher uses it to tell a stale duplicate from a current one.

use core::fmt;

use crate::time::Timestamp;

/// Event produced by the presence state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceEvent {
    /// Continuous activity reached the debounce window
    MotionStarted {
        /// Timestamp of the sample that completed the debounce
        at: Timestamp,
    },

    /// Continuous inactivity reached the cooldown window
    MotionEnded {
        /// Timestamp of the sample that completed the cooldown
        at: Timestamp,
    },

    /// Presence is still asserted
    StillActive {
        /// Timestamp of the active sample that triggered the reminder
        at: Timestamp,
    },

    /// Presence is still absent
    StillIdle {
        /// Timestamp of the idle sample that triggered the reminder
        at: Timestamp,
    },
}

impl PresenceEvent {
    /// Timestamp of the causal sample
    pub const fn timestamp(&self) -> Timestamp {
        match self {
            Self::MotionStarted { at }
            | Self::MotionEnded { at }
            | Self::StillActive { at }
            | Self::StillIdle { at } => *at,
        }
    }

    /// Presence value this event asserts
    pub const fn payload(&self) -> bool {
        matches!(self, Self::MotionStarted { .. } | Self::StillActive { .. })
    }

    /// Whether this event changes presence
    pub const fn is_transition(&self) -> bool {
        matches!(self, Self::MotionStarted { .. } | Self::MotionEnded { .. })
    }

    /// Short machine-friendly name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MotionStarted { .. } => "motion_started",
            Self::MotionEnded { .. } => "motion_ended",
            Self::StillActive { .. } => "still_active",
            Self::StillIdle { .. } => "still_idle",
        }
    }
}

impl fmt::Display for PresenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MotionStarted { at } => write!(f, "Motion started at {}ms", at),
            Self::MotionEnded { at } => write!(f, "Motion ended at {}ms", at),
            Self::StillActive { at } => write!(f, "Motion still active at {}ms", at),
            Self::StillIdle { at } => write!(f, "Still idle at {}ms", at),
        }
    }
}

/// Wire payload for a presence value
pub const fn payload_str(present: bool) -> &'static str {
    if present {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads() {
        assert!(PresenceEvent::MotionStarted { at: 1 }.payload());
        assert!(PresenceEvent::StillActive { at: 1 }.payload());
        assert!(!PresenceEvent::MotionEnded { at: 1 }.payload());
        assert!(!PresenceEvent::StillIdle { at: 1 }.payload());
        assert_eq!(payload_str(true), "true");
        assert_eq!(payload_str(false), "false");
    }

    #[test]
    fn transitions_versus_reminders() {
        assert!(PresenceEvent::MotionStarted { at: 5 }.is_transition());
        assert!(PresenceEvent::MotionEnded { at: 5 }.is_transition());
        assert!(!PresenceEvent::StillActive { at: 5 }.is_transition());
        assert!(!PresenceEvent::StillIdle { at: 5 }.is_transition());
    }

    #[test]
    fn event_size() {
        assert!(core::mem::size_of::<PresenceEvent>() <= 16);
    }
}
