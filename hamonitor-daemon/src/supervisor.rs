//! Crash-restart supervision
//!
//! The sensor driver is the part that crashes, so the answer to any failure is
//! the same: wait, then start over with a fresh pipeline. Presence state does
//! not survive a restart. A crash while `Active` means presence is reported
//! again only after the next full debounce window.
//!
//! Each run is spawned as its own task so a panic surfaces as a failed run
//! instead of taking the process down.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use hamonitor_core::constants::RESTART_BACKOFF_MS;
use log::{error, info, warn};
use thiserror::Error;
use tokio::task::JoinError;

/// Restart policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Wait between a failed run and the next one
    pub backoff: Duration,
    /// Give up after this many restarts, `None` for never
    pub max_restarts: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(RESTART_BACKOFF_MS),
            max_restarts: None,
        }
    }
}

/// Supervision errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Giving up after {restarts} restarts, last failure: {last}")]
    Exhausted { restarts: u32, last: String },
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum Failure {
    Error(String),
    Panic(String),
    Cancelled,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => f.write_str(e),
            Self::Panic(msg) => write!(f, "panicked: {}", msg),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl From<JoinError> for Failure {
    fn from(e: JoinError) -> Self {
        if e.is_panic() {
            Self::Panic(panic_message(e.into_panic()))
        } else {
            Self::Cancelled
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}

/// Restarts pipeline runs until one finishes cleanly
#[derive(Debug, Clone)]
pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Run `make_run(attempt)` until a run returns `Ok(())`
    ///
    /// Attempts are numbered from 1. Errors and panics both count as crashes.
    pub async fn supervise<F, Fut, E>(&self, mut make_run: F) -> Result<(), SupervisorError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut restarts = 0u32;

        loop {
            let attempt = restarts + 1;
            if attempt > 1 {
                info!("Starting pipeline, attempt {}", attempt);
            }

            let failure = match tokio::spawn(make_run(attempt)).await {
                Ok(Ok(())) => {
                    info!("Pipeline finished");
                    return Ok(());
                }
                Ok(Err(e)) => Failure::Error(e.to_string()),
                Err(e) => Failure::from(e),
            };
            error!("Pipeline crashed: {}", failure);

            if self.config.max_restarts.is_some_and(|max| restarts >= max) {
                return Err(SupervisorError::Exhausted {
                    restarts,
                    last: failure.to_string(),
                });
            }

            restarts += 1;
            warn!(
                "Restarting in {}s (restart {})",
                self.config.backoff.as_secs_f32(),
                restarts
            );
            tokio::time::sleep(self.config.backoff).await;
        }
    }
}
