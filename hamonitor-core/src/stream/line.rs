//! Line-oriented sample streams
//!
//! Reads one intensity sample per line from any `BufRead`: the stdout of a
//! frame-differencing helper piped into stdin, or a recorded replay file.
//!
//! ## Supported Line Formats
//!
//! ```text
//! # comment lines and blank lines are skipped
//! 1250000                 <- value only, stamped on arrival
//! 1033 1250000            <- timestamp_ms and value, whitespace separated
//! 1066,1250000            <- timestamp_ms and value, comma separated
//! ```
//!
//! Malformed lines are counted and skipped; a single garbled line from the
//! helper should not take the pipeline down.

use std::io::{self, BufRead};

use super::{Stream, StreamError};
use crate::sample::IntensitySample;
use crate::time::{TimeSource, Timestamp};

/// Statistics for line streaming
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineStreamStats {
    /// Lines read, including skipped ones
    pub lines_processed: usize,
    /// Samples produced
    pub samples_read: usize,
    /// Lines that could not be parsed
    pub parse_errors: usize,
    /// Bytes read
    pub bytes_read: usize,
}

/// Sample stream over a line reader
///
/// ## Example
///
/// ```rust
/// use hamonitor_core::stream::{LineStream, StreamError};
/// use hamonitor_core::time::FixedTime;
/// use hamonitor_core::Stream;
///
/// let input = "# ts value\n0 1200000\n33,900000\n";
/// let mut stream = LineStream::new(input.as_bytes(), FixedTime::new(0));
///
/// assert_eq!(stream.poll_next().ok().map(|s| s.value), Some(1_200_000));
/// assert_eq!(stream.poll_next().ok().map(|s| s.timestamp), Some(33));
/// assert!(matches!(stream.poll_next(), Err(nb::Error::Other(StreamError::EndOfStream))));
/// ```
pub struct LineStream<R, T> {
    reader: R,
    clock: T,
    line: String,
    /// Last timestamp handed out for an unstamped line
    last_stamp: Option<Timestamp>,
    eof: bool,
    stats: LineStreamStats,
}

impl<R: BufRead, T: TimeSource> LineStream<R, T> {
    /// Create a stream over `reader`, stamping bare values from `clock`
    pub fn new(reader: R, clock: T) -> Self {
        if clock.is_wall_clock() {
            log_warn!("Line stream stamped from a wall clock; clock adjustments will skew timers");
        }

        Self {
            reader,
            clock,
            line: String::with_capacity(64),
            last_stamp: None,
            eof: false,
            stats: LineStreamStats::default(),
        }
    }

    /// Get statistics
    pub fn stats(&self) -> &LineStreamStats {
        &self.stats
    }

    /// Stamp for a value-only line, strictly after the previous stamp
    fn stamp(&mut self) -> Timestamp {
        let now = self.clock.now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// Split a non-comment line into an optional timestamp and a value
fn parse_line(line: &str) -> Result<(Option<Timestamp>, u64), StreamError<io::Error>> {
    let mut fields = heapless::Vec::<&str, 2>::new();
    for field in line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
    {
        fields
            .push(field)
            .map_err(|_| StreamError::Format("Too many fields"))?;
    }

    let parse_u64 = |field: &str, what: &'static str| -> Result<u64, StreamError<io::Error>> {
        field.parse::<u64>().map_err(|_| StreamError::Format(what))
    };

    match fields.as_slice() {
        [value] => Ok((None, parse_u64(value, "Invalid value")?)),
        [timestamp, value] => Ok((
            Some(parse_u64(timestamp, "Invalid timestamp")?),
            parse_u64(value, "Invalid value")?,
        )),
        _ => Err(StreamError::Format("Empty line")),
    }
}

impl<R: BufRead, T: TimeSource> Stream for LineStream<R, T> {
    type Item = IntensitySample;
    type Error = StreamError<io::Error>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        loop {
            if self.eof {
                return Err(nb::Error::Other(StreamError::EndOfStream));
            }

            self.line.clear();
            let read = match self.reader.read_line(&mut self.line) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(nb::Error::WouldBlock)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(nb::Error::Other(StreamError::Transport(e))),
            };

            if read == 0 {
                self.eof = true;
                continue;
            }

            self.stats.lines_processed += 1;
            self.stats.bytes_read += read;

            let trimmed = self.line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_line(trimmed) {
                Ok((timestamp, value)) => {
                    let timestamp = match timestamp {
                        Some(timestamp) => timestamp,
                        None => self.stamp(),
                    };
                    self.stats.samples_read += 1;
                    return Ok(IntensitySample::new(value, timestamp));
                }
                Err(_e) => {
                    self.stats.parse_errors += 1;
                    log_warn!("Skipping line {}: {}", self.stats.lines_processed, _e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTime;

    fn drain<R: BufRead, T: TimeSource>(stream: &mut LineStream<R, T>) -> Vec<IntensitySample> {
        let mut out = Vec::new();
        while let Ok(sample) = stream.poll_next() {
            out.push(sample);
        }
        out
    }

    #[test]
    fn both_formats_and_comments() {
        let input = "# recorded 2024-01-01\n\n100 5\n200,6\n  300\t7  \n";
        let mut stream = LineStream::new(input.as_bytes(), FixedTime::new(0));

        assert_eq!(
            drain(&mut stream),
            vec![
                IntensitySample::new(5, 100),
                IntensitySample::new(6, 200),
                IntensitySample::new(7, 300),
            ]
        );
        assert_eq!(stream.stats().samples_read, 3);
        assert_eq!(stream.stats().lines_processed, 5);
        assert_eq!(stream.stats().parse_errors, 0);
    }

    #[test]
    fn garbage_is_skipped_and_counted() {
        let input = "abc\n1 2 3\n-5\n10 20\n";
        let mut stream = LineStream::new(input.as_bytes(), FixedTime::new(0));

        assert_eq!(drain(&mut stream), vec![IntensitySample::new(20, 10)]);
        assert_eq!(stream.stats().parse_errors, 3);
    }

    #[test]
    fn bare_values_get_increasing_stamps() {
        let input = "1\n2\n3\n";
        let mut stream = LineStream::new(input.as_bytes(), FixedTime::new(500));

        let stamps: Vec<_> = drain(&mut stream).iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![500, 501, 502]);
    }

    #[test]
    fn end_of_stream_is_sticky() {
        let mut stream = LineStream::new(&b""[..], FixedTime::new(0));
        for _ in 0..2 {
            assert!(matches!(
                stream.poll_next(),
                Err(nb::Error::Other(StreamError::EndOfStream))
            ));
        }
    }
}
