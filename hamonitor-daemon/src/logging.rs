//! Logging setup
//!
//! Library crates log through the `log` facade; the subscriber installed here
//! picks those records up through its `log` bridge. `RUST_LOG` always wins
//! over `--quiet` / `--debug`.
//!
//! The subscriber goes in before settings are resolved, so config file
//! warnings are not lost. Its level comes from the command line first and is
//! adjusted once the config file's `QUIET` / `DEBUG` are known.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset
pub fn default_directive(quiet: bool, debug: bool) -> &'static str {
    match (quiet, debug) {
        (_, true) => "debug",
        (true, false) => "warn",
        (false, false) => "info",
    }
}

/// Handle on the installed subscriber's level
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevel {
    /// Switch to the level for `quiet` / `debug`, unless `RUST_LOG` is in charge
    pub fn update(&self, quiet: bool, debug: bool) {
        if self.from_env {
            return;
        }
        if let Err(e) = self
            .handle
            .reload(EnvFilter::new(default_directive(quiet, debug)))
        {
            log::warn!("Could not change log level: {}", e);
        }
    }
}

/// Install the global subscriber
///
/// Returns `None` when a subscriber was already installed.
pub fn init(quiet: bool, debug: bool) -> Option<LogLevel> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_directive(quiet, debug)), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(debug))
        .try_init()
        .ok()?;

    Some(LogLevel { handle, from_env })
}
