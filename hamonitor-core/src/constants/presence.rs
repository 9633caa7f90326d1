//! Intensity Threshold Constants
//!
//! Intensities are sums over a binary motion mask: each pixel whose depth
//! changed by more than the differencing cutoff contributes 255. A 640x480
//! depth frame therefore tops out a little above 78 million.

/// Mask value of one changed pixel.
pub const CHANGED_PIXEL_WEIGHT: u64 = 255;

/// Pixels in one depth frame (640 x 480).
pub const PIXELS_PER_FRAME: u64 = 640 * 480;

/// Largest intensity a single frame can report.
pub const MAX_FRAME_INTENSITY: u64 = CHANGED_PIXEL_WEIGHT * PIXELS_PER_FRAME;

/// Default threshold for the per-frame (oneshot) profile.
///
/// Roughly 4000 changed pixels: someone moving in the field of view,
/// not sensor speckle.
pub const ONESHOT_THRESHOLD: u64 = 1_000_000;

/// Default threshold for the averaged (runloop) profile.
///
/// Averages over several seconds are dominated by sustained motion, so the
/// bar is set higher.
pub const RUNLOOP_THRESHOLD: u64 = 8_000_000;
