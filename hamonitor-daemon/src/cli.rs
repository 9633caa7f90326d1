//! Command line interface

use std::path::PathBuf;

use clap::Parser;

/// Kinect presence bridge for MQTT and Home Assistant
///
/// Reads one motion intensity per line (from stdin, a file or a helper
/// command), debounces it into presence and publishes `true`/`false` to MQTT.
/// Options left unset fall back to the config file, then to the profile
/// defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hamonitor")]
#[command(author, version, about)]
pub struct Cli {
    /// MQTT broker, `host` or `host:port`
    #[arg(long, value_name = "HOST[:PORT]")]
    pub broker: Option<String>,

    /// MQTT broker port, overrides any port in --broker
    #[arg(long)]
    pub port: Option<u16>,

    /// Topic presence is published on
    #[arg(long)]
    pub topic: Option<String>,

    /// Intensity a frame must exceed to count as motion
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Launch profile: `oneshot` (per frame) or `runloop` (5 s averages)
    #[arg(long)]
    pub profile: Option<String>,

    /// Continuous motion needed before presence is reported, in seconds
    #[arg(long, value_name = "SECS")]
    pub debounce_secs: Option<u64>,

    /// Stillness needed before presence is withdrawn, in seconds
    #[arg(long, value_name = "SECS")]
    pub cooldown_secs: Option<u64>,

    /// Delay before each transition is published a second time, in seconds
    #[arg(long, value_name = "SECS")]
    pub redundancy_secs: Option<u64>,

    /// KEY=VALUE config file
    #[arg(long, value_name = "PATH", env = "HAMONITOR_CONFIG", default_value = "config.conf")]
    pub config: PathBuf,

    /// Intensity lines to read, `-` for stdin
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub input: String,

    /// Helper command whose stdout supplies intensity lines
    #[arg(long, value_name = "CMD", conflicts_with = "input")]
    pub source_cmd: Option<String>,

    /// MQTT client identifier
    #[arg(long)]
    pub client_id: Option<String>,

    /// Only log warnings and errors
    #[arg(long)]
    pub quiet: bool,

    /// Log every frame decision
    #[arg(long)]
    pub debug: bool,

    /// Skip the Home Assistant discovery message
    #[arg(long)]
    pub no_discovery: bool,

    /// Log messages instead of connecting to a broker
    #[arg(long)]
    pub dry_run: bool,

    /// Exit on the first failure instead of restarting
    #[arg(long)]
    pub no_supervise: bool,

    /// Wait between a crash and the restart, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub restart_delay_secs: u64,
}
