//! Resolved runtime settings
//!
//! Every option is looked up in the same order:
//!
//! 1. command line flag
//! 2. config file (`KEY=VALUE`, default `config.conf`)
//! 3. environment, for `MQTT_USER` / `MQTT_PASS` only
//! 4. profile default
//!
//! A missing config file is fine. An unreadable or malformed one, or any value
//! that does not parse, is fatal: restarting cannot fix it.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hamonitor_connectors::discovery::DEFAULT_OBJECT_ID;
use hamonitor_connectors::mqtt::{parse_broker, validate_topic, MqttConfig, MqttError};
use hamonitor_connectors::DEFAULT_TOPIC;
use hamonitor_core::constants::{DEFAULT_REDUNDANCY_DELAY_MS, RESTART_BACKOFF_MS};
use hamonitor_core::{ConfigError, PresenceConfig, Profile, Threshold};
use thiserror::Error;

use crate::cli::Cli;
use crate::source::SourceSpec;
use crate::supervisor::SupervisorConfig;

/// Broker used when none is configured
pub const DEFAULT_BROKER: &str = "localhost";

/// Keys understood in the config file
const KNOWN_KEYS: &[&str] = &[
    "BROKER",
    "TOPIC",
    "THRESHOLD",
    "PROFILE",
    "QUIET",
    "DEBUG",
    "MQTT_USER",
    "MQTT_PASS",
    "MQTT_PORT",
    "DEBOUNCE_SECS",
    "COOLDOWN_SECS",
    "REDUNDANCY_SECS",
    "DISCOVERY",
];

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{origin}:{line}: expected KEY=VALUE")]
    Malformed { origin: String, line: usize },

    #[error("Invalid value for {key}: `{value}`")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown profile `{0}` (expected `oneshot` or `runloop`)")]
    UnknownProfile(String),

    #[error(transparent)]
    Mqtt(#[from] MqttError),

    #[error("Invalid presence settings: {0}")]
    Presence(#[from] ConfigError),
}

/// Parsed `KEY=VALUE` config file
///
/// Keys are case-insensitive. Blank lines and lines starting with `#` or `;`
/// are skipped, values may be quoted, and empty values count as unset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    values: HashMap<String, String>,
}

impl ConfigFile {
    /// Parse config text; `origin` names it in errors
    pub fn parse(text: &str, origin: &str) -> Result<Self, SettingsError> {
        let mut values = HashMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| SettingsError::Malformed {
                origin: origin.to_string(),
                line: index + 1,
            })?;

            let key = key.trim().to_ascii_uppercase();
            if key.is_empty() {
                return Err(SettingsError::Malformed {
                    origin: origin.to_string(),
                    line: index + 1,
                });
            }
            if !KNOWN_KEYS.contains(&key.as_str()) {
                log::warn!("{}:{}: ignoring unknown key {}", origin, index + 1, key);
            }

            values.insert(key, unquote(value.trim()).to_string());
        }

        Ok(Self { values })
    }

    /// Load `path`, `None` if it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, &path.display().to_string()).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Raw value, `None` when absent or empty
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn parse_value<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>, SettingsError> {
        self.get(key)
            .map(|value| {
                value.parse().map_err(|_| SettingsError::InvalidValue {
                    key,
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, SettingsError> {
        self.get(key)
            .map(|value| {
                parse_bool(value).ok_or_else(|| SettingsError::InvalidValue {
                    key,
                    value: value.to_string(),
                })
            })
            .transpose()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Everything a pipeline run needs
#[derive(Debug, Clone)]
pub struct Settings {
    pub broker: String,
    pub port: Option<u16>,
    pub topic: String,
    pub client_id: Option<String>,
    pub credentials: Option<(String, String)>,
    pub profile: Profile,
    pub presence: PresenceConfig,
    /// Frame averaging window, from the profile
    pub averaging_window: Option<Duration>,
    pub redundancy_delay: Duration,
    pub discovery: bool,
    pub discovery_object_id: String,
    pub dry_run: bool,
    pub quiet: bool,
    pub debug: bool,
    pub source: SourceSpec,
    pub restart_backoff: Duration,
    pub supervise: bool,
}

impl Settings {
    /// Resolve from the command line, its config file and the process environment
    pub fn resolve(cli: &Cli) -> Result<Self, SettingsError> {
        let file = ConfigFile::load(&cli.config)?.unwrap_or_default();
        Self::from_layers(cli, &file, |key| std::env::var(key).ok())
    }

    /// Resolve from explicit layers
    pub fn from_layers<E>(cli: &Cli, file: &ConfigFile, env: E) -> Result<Self, SettingsError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let profile = match cli.profile.as_deref().or(file.get("PROFILE")) {
            Some(name) => name
                .parse::<Profile>()
                .map_err(|_| SettingsError::UnknownProfile(name.to_string()))?,
            None => Profile::default(),
        };

        let threshold = match cli.threshold {
            Some(value) => Threshold::new(value),
            None => file
                .parse_value::<u64>("THRESHOLD")?
                .map(Threshold::new)
                .unwrap_or(profile.threshold()),
        };

        let mut presence = profile.presence_config().with_threshold(threshold);
        if let Some(secs) = pick(cli.debounce_secs, file.parse_value("DEBOUNCE_SECS")?) {
            presence = presence.with_debounce(Duration::from_secs(secs));
        }
        if let Some(secs) = pick(cli.cooldown_secs, file.parse_value("COOLDOWN_SECS")?) {
            presence = presence.with_cooldown(Duration::from_secs(secs));
        }
        presence.validate()?;

        let redundancy_delay = pick(cli.redundancy_secs, file.parse_value("REDUNDANCY_SECS")?)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_millis(DEFAULT_REDUNDANCY_DELAY_MS));
        if redundancy_delay.is_zero() {
            return Err(SettingsError::InvalidValue {
                key: "REDUNDANCY_SECS",
                value: "0".to_string(),
            });
        }

        let broker = cli
            .broker
            .clone()
            .or_else(|| file.get("BROKER").map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BROKER.to_string());
        // A port spelled out in `--broker` outranks the file's MQTT_PORT
        let file_port = file.parse_value("MQTT_PORT")?;
        let broker_port = match &cli.broker {
            Some(broker) => parse_broker(broker)?.1,
            None => None,
        };
        let port = match (cli.port, broker_port) {
            (Some(port), _) => Some(port),
            (None, Some(_)) => None,
            (None, None) => file_port,
        };

        let topic = cli
            .topic
            .clone()
            .or_else(|| file.get("TOPIC").map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        validate_topic(&topic)?;

        let username = file.get("MQTT_USER").map(str::to_string).or_else(|| env("MQTT_USER"));
        let password = file.get("MQTT_PASS").map(str::to_string).or_else(|| env("MQTT_PASS"));
        let credentials = match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        };

        let settings = Self {
            broker,
            port,
            topic,
            client_id: cli.client_id.clone(),
            credentials,
            profile,
            presence,
            averaging_window: profile.averaging_window(),
            redundancy_delay,
            discovery: !cli.no_discovery && file.flag("DISCOVERY")?.unwrap_or(true),
            discovery_object_id: DEFAULT_OBJECT_ID.to_string(),
            dry_run: cli.dry_run,
            quiet: cli.quiet || file.flag("QUIET")?.unwrap_or(false),
            debug: cli.debug || file.flag("DEBUG")?.unwrap_or(false),
            source: SourceSpec::from_cli(&cli.input, cli.source_cmd.as_deref()),
            restart_backoff: Duration::from_secs(cli.restart_delay_secs),
            supervise: !cli.no_supervise,
        };

        // Surface a bad broker now rather than on every restart
        settings.mqtt_config()?;
        Ok(settings)
    }

    /// Broker connection settings
    pub fn mqtt_config(&self) -> Result<MqttConfig, MqttError> {
        let mut config = MqttConfig::new(&self.broker)?;
        if let Some(port) = self.port {
            config = config.port(port);
        }
        if let Some(id) = &self.client_id {
            config = config.client_id(id);
        }
        if let Some((user, pass)) = &self.credentials {
            config = config.credentials(user, pass);
        }
        config.validate()?;
        Ok(config)
    }

    /// Restart policy
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            backoff: self.restart_backoff,
            max_restarts: if self.supervise { None } else { Some(0) },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let profile = Profile::default();
        Self {
            broker: DEFAULT_BROKER.to_string(),
            port: None,
            topic: DEFAULT_TOPIC.to_string(),
            client_id: None,
            credentials: None,
            profile,
            presence: profile.presence_config(),
            averaging_window: profile.averaging_window(),
            redundancy_delay: Duration::from_millis(DEFAULT_REDUNDANCY_DELAY_MS),
            discovery: true,
            discovery_object_id: DEFAULT_OBJECT_ID.to_string(),
            dry_run: false,
            quiet: false,
            debug: false,
            source: SourceSpec::Stdin,
            restart_backoff: Duration::from_millis(RESTART_BACKOFF_MS),
            supervise: true,
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "profile {}, threshold {}, broker {}{}, topic {}, source {}",
            self.profile,
            self.presence.threshold,
            self.broker,
            self.port.map(|p| format!(" (port {})", p)).unwrap_or_default(),
            self.topic,
            self.source
        )?;
        if self.dry_run {
            f.write_str(", dry run")?;
        }
        Ok(())
    }
}

fn pick<T>(flag: Option<T>, file: Option<T>) -> Option<T> {
    flag.or(file)
}
