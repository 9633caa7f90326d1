//! Intensity sources
//!
//! Frame capture and differencing happen outside this process. Whatever does
//! them writes one intensity per line, and this module turns those lines into
//! samples:
//!
//! - `Stdin`: piped from a helper started by a launch script
//! - `File`: a recording, replayed once
//! - `Command`: a helper spawned here, so a restart re-spawns the helper too
//!
//! Reading blocks, so the stream is drained on a blocking thread and handed to
//! the async pipeline over a bounded channel.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

use hamonitor_core::stream::{LineStream, StreamError, WindowedAverage};
use hamonitor_core::time::MonotonicClock;
use hamonitor_core::{ConfigError, IntensitySample, Stream};
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc;

/// Pause before polling a source that had nothing ready
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Boxed sample stream as produced by [`open`]
pub type SampleStream =
    Box<dyn Stream<Item = IntensitySample, Error = StreamError<io::Error>> + Send>;

/// Source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Could not open {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid averaging window: {0}")]
    Window(#[from] ConfigError),

    #[error("Reading samples failed: {0}")]
    Read(String),

    #[error("Sample source ended")]
    Ended,
}

/// Where intensity lines come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    File(PathBuf),
    Command(String),
}

impl SourceSpec {
    /// Source selected by `--input` / `--source-cmd`
    pub fn from_cli(input: &str, command: Option<&str>) -> Self {
        match command {
            Some(command) => Self::Command(command.to_string()),
            None if input == "-" => Self::Stdin,
            None => Self::File(PathBuf::from(input)),
        }
    }

    /// Whether running out of samples is the expected end of the run
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("stdin"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Command(command) => write!(f, "`{}`", command),
        }
    }
}

/// Line stream over the stdout of a helper process
///
/// The helper is killed when the source is dropped.
pub struct CommandSource {
    child: Child,
    lines: LineStream<BufReader<ChildStdout>, MonotonicClock>,
}

impl CommandSource {
    /// Start `command` through `sh -c`
    pub fn spawn(command: &str) -> io::Result<Self> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "helper stdout not captured"))?;
        debug!("Started helper `{}` (pid {})", command, child.id());

        Ok(Self {
            child,
            lines: LineStream::new(BufReader::new(stdout), MonotonicClock::new()),
        })
    }
}

impl Stream for CommandSource {
    type Item = IntensitySample;
    type Error = StreamError<io::Error>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        self.lines.poll_next()
    }
}

impl Drop for CommandSource {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Open `spec`, averaging over `window` when given
pub fn open(spec: &SourceSpec, window: Option<Duration>) -> Result<SampleStream, SourceError> {
    let open_error = |source| SourceError::Open {
        name: spec.to_string(),
        source,
    };

    let lines: SampleStream = match spec {
        SourceSpec::Stdin => Box::new(LineStream::new(
            BufReader::new(io::stdin()),
            MonotonicClock::new(),
        )),
        SourceSpec::File(path) => {
            let file = File::open(path).map_err(open_error)?;
            Box::new(LineStream::new(BufReader::new(file), MonotonicClock::new()))
        }
        SourceSpec::Command(command) => Box::new(CommandSource::spawn(command).map_err(open_error)?),
    };

    match window {
        Some(window) => Ok(Box::new(WindowedAverage::new(lines, window)?)),
        None => Ok(lines),
    }
}

/// Drain `source` on a blocking thread into a channel
///
/// The last item is always an error: [`SourceError::Ended`] at end of stream,
/// [`SourceError::Read`] on failure. The thread exits once the receiver is
/// dropped and the next sample arrives.
pub fn pump(
    mut source: SampleStream,
    capacity: usize,
) -> mpsc::Receiver<Result<IntensitySample, SourceError>> {
    let (tx, rx) = mpsc::channel(capacity);

    tokio::task::spawn_blocking(move || loop {
        let item = match source.poll_next() {
            Ok(sample) => Ok(sample),
            Err(nb::Error::WouldBlock) => {
                std::thread::sleep(IDLE_POLL);
                continue;
            }
            Err(nb::Error::Other(StreamError::EndOfStream)) => Err(SourceError::Ended),
            Err(nb::Error::Other(e)) => {
                warn!("Sample source failed: {}", e);
                Err(SourceError::Read(e.to_string()))
            }
        };

        let last = item.is_err();
        if tx.blocking_send(item).is_err() || last {
            break;
        }
    });

    rx
}
