//! Intensity samples and the activity threshold
//!
//! One [`IntensitySample`] summarises one depth frame: how many pixels changed
//! (weighted) against the previous frame. The frame-differencing itself lives
//! outside this crate; only the resulting scalar crosses the boundary.

use core::fmt;

use crate::time::Timestamp;

/// Motion intensity of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntensitySample {
    /// Summed motion mask for the frame
    pub value: u64,
    /// Monotonic capture time in milliseconds
    pub timestamp: Timestamp,
}

impl IntensitySample {
    /// Create a sample
    pub const fn new(value: u64, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    /// Whether this frame counts as activity under `threshold`
    #[inline]
    pub const fn is_active(&self, threshold: Threshold) -> bool {
        threshold.is_exceeded_by(self.value)
    }
}

/// Activity threshold: a frame is active when its intensity is strictly greater
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(u64);

impl Threshold {
    /// Wrap a raw intensity threshold
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw threshold value
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// `value > threshold`
    #[inline]
    pub const fn is_exceeded_by(&self, value: u64) -> bool {
        value > self.0
    }
}

impl From<u64> for Threshold {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
