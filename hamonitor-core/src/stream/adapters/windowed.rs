//! Windowed averaging
//!
//! Collapses all samples inside a fixed window into one sample carrying their
//! mean intensity. Windows are keyed on sample timestamps, not on when
//! `poll_next` happens to be called, so replaying a recording gives the same
//! averages as the live run did.
//!
//! A window opens with the first sample after the previous one closed and
//! closes on the first sample at least `window` milliseconds later. That
//! closing sample is part of the average and its timestamp becomes the
//! timestamp of the emitted sample. A window still open at end of stream is
//! dropped.

use core::time::Duration;

use crate::errors::ConfigError;
use crate::sample::IntensitySample;
use crate::stream::Stream;
use crate::time::{duration_to_ms, elapsed_ms, Timestamp};

/// Counters for an averaging adapter
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
    /// Samples pulled from the inner stream
    pub samples_in: u64,
    /// Averages emitted
    pub windows_emitted: u64,
}

/// Averages an intensity stream over fixed windows
///
/// ## Example
///
/// ```rust
/// use core::time::Duration;
/// use hamonitor_core::stream::{MemoryStream, WindowedAverage};
/// use hamonitor_core::{IntensitySample, Stream};
///
/// let frames = [
///     IntensitySample::new(10, 0),
///     IntensitySample::new(20, 500),
///     IntensitySample::new(30, 1000),
/// ];
/// let mut averaged =
///     WindowedAverage::new(MemoryStream::new(&frames[..]), Duration::from_secs(1)).unwrap();
///
/// assert_eq!(averaged.poll_next().ok(), Some(IntensitySample::new(20, 1000)));
/// ```
#[derive(Debug)]
pub struct WindowedAverage<S> {
    inner: S,
    window_ms: u64,
    /// Timestamp of the first sample in the open window
    opened_at: Option<Timestamp>,
    sum: u128,
    count: u64,
    stats: WindowStats,
}

impl<S> WindowedAverage<S>
where
    S: Stream<Item = IntensitySample>,
{
    /// Wrap `inner`, averaging over `window`
    pub fn new(inner: S, window: Duration) -> Result<Self, ConfigError> {
        let window_ms = duration_to_ms(window)
            .ok_or(ConfigError::DurationOverflow { field: "averaging_window" })?;
        if window_ms == 0 {
            return Err(ConfigError::ZeroAveragingWindow);
        }

        Ok(Self {
            inner,
            window_ms,
            opened_at: None,
            sum: 0,
            count: 0,
            stats: WindowStats::default(),
        })
    }

    /// Window length in milliseconds
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Samples accumulated in the open window
    pub fn pending(&self) -> u64 {
        self.count
    }

    /// Get statistics
    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Get a reference to the wrapped stream
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap, discarding any open window
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn accumulate(&mut self, sample: IntensitySample) -> Option<IntensitySample> {
        self.stats.samples_in += 1;

        let opened_at = *self.opened_at.get_or_insert(sample.timestamp);
        self.sum += u128::from(sample.value);
        self.count += 1;

        if elapsed_ms(opened_at, sample.timestamp) < self.window_ms {
            return None;
        }

        let mean = self.sum / u128::from(self.count);
        let mean = u64::try_from(mean).unwrap_or(u64::MAX);
        log_debug!(
            "Window {}..{}ms: {} frames, mean {}",
            opened_at,
            sample.timestamp,
            self.count,
            mean
        );

        self.opened_at = None;
        self.sum = 0;
        self.count = 0;
        self.stats.windows_emitted += 1;

        Some(IntensitySample::new(mean, sample.timestamp))
    }
}

impl<S> Stream for WindowedAverage<S>
where
    S: Stream<Item = IntensitySample>,
{
    type Item = IntensitySample;
    type Error = S::Error;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        loop {
            let sample = self.inner.poll_next()?;
            if let Some(average) = self.accumulate(sample) {
                return Ok(average);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.inner.size_hint();
        (0, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryStream, StreamError};

    fn frames(every_ms: u64, values: &[u64]) -> std::vec::Vec<IntensitySample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| IntensitySample::new(v, i as u64 * every_ms))
            .collect()
    }

    #[test]
    fn zero_window_rejected() {
        let stream = MemoryStream::new(std::vec::Vec::<IntensitySample>::new());
        assert_eq!(
            WindowedAverage::new(stream, Duration::ZERO).err(),
            Some(ConfigError::ZeroAveragingWindow)
        );
    }

    #[test]
    fn averages_each_window() {
        // 0, 1000, ..., 4000 close nothing; 5000 closes the first window.
        let input = frames(1000, &[10, 10, 10, 10, 10, 70, 2, 4, 6, 8, 10, 12]);
        let mut averaged =
            WindowedAverage::new(MemoryStream::new(input), Duration::from_secs(5)).unwrap();

        assert_eq!(averaged.poll_next().ok(), Some(IntensitySample::new(20, 5000)));
        // Second window opens at 6000 and closes at 11000.
        assert_eq!(averaged.poll_next().ok(), Some(IntensitySample::new(7, 11000)));
        assert_eq!(
            averaged.poll_next(),
            Err(nb::Error::Other(StreamError::EndOfStream))
        );
        assert_eq!(averaged.stats().windows_emitted, 2);
        assert_eq!(averaged.stats().samples_in, 12);
    }

    #[test]
    fn partial_window_dropped_at_end() {
        let input = frames(100, &[5_000_000; 10]);
        let mut averaged =
            WindowedAverage::new(MemoryStream::new(input), Duration::from_secs(5)).unwrap();

        assert!(averaged.poll_next().is_err());
        assert_eq!(averaged.pending(), 10);
        assert_eq!(averaged.stats().windows_emitted, 0);
    }

    #[test]
    fn large_values_do_not_overflow() {
        let input = frames(1000, &[u64::MAX, u64::MAX]);
        let mut averaged =
            WindowedAverage::new(MemoryStream::new(input), Duration::from_secs(1)).unwrap();
        assert_eq!(averaged.poll_next().ok().map(|s| s.value), Some(u64::MAX));
    }
}
