//! Presence configuration and launch profiles
//!
//! Two launch profiles exist, and they are not equivalent:
//!
//! | Profile   | Evaluates            | Threshold  | Cooldown | Re-affirms |
//! |-----------|----------------------|------------|----------|------------|
//! | `oneshot` | every frame          | 1,000,000  | 4 min    | never      |
//! | `runloop` | 5 s frame averages   | 8,000,000  | 150 s    | every 5 s  |
//!
//! Both share the 5 s debounce. The runloop cooldown is 30 quiet windows in a
//! row. Thresholds and windows can be overridden; the profile only supplies
//! defaults.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use crate::constants::{
    DEFAULT_COOLDOWN_MS, DEFAULT_DEBOUNCE_MS, ONESHOT_THRESHOLD, RUNLOOP_AVERAGING_WINDOW_MS,
    RUNLOOP_COOLDOWN_MS, RUNLOOP_REAFFIRM_INTERVAL_MS, RUNLOOP_THRESHOLD,
};
use crate::errors::ConfigError;
use crate::sample::Threshold;
use crate::time::duration_to_ms;

/// Launch profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    /// Evaluate every frame against the threshold
    #[default]
    Oneshot,
    /// Evaluate windowed frame averages and re-affirm periodically
    Runloop,
}

impl Profile {
    /// Profile name as used on the command line and in config files
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Oneshot => "oneshot",
            Self::Runloop => "runloop",
        }
    }

    /// Default activity threshold
    pub const fn threshold(&self) -> Threshold {
        match self {
            Self::Oneshot => Threshold::new(ONESHOT_THRESHOLD),
            Self::Runloop => Threshold::new(RUNLOOP_THRESHOLD),
        }
    }

    /// Window over which frames are averaged before evaluation, if any
    pub const fn averaging_window(&self) -> Option<Duration> {
        match self {
            Self::Oneshot => None,
            Self::Runloop => Some(Duration::from_millis(RUNLOOP_AVERAGING_WINDOW_MS)),
        }
    }

    /// Re-affirmation interval, if any
    pub const fn reaffirm_interval(&self) -> Option<Duration> {
        match self {
            Self::Oneshot => None,
            Self::Runloop => Some(Duration::from_millis(RUNLOOP_REAFFIRM_INTERVAL_MS)),
        }
    }

    /// Inactivity that ends presence
    pub const fn cooldown(&self) -> Duration {
        match self {
            Self::Oneshot => Duration::from_millis(DEFAULT_COOLDOWN_MS),
            Self::Runloop => Duration::from_millis(RUNLOOP_COOLDOWN_MS),
        }
    }

    /// State machine configuration with this profile's defaults
    pub fn presence_config(&self) -> PresenceConfig {
        PresenceConfig {
            threshold: self.threshold(),
            cooldown: self.cooldown(),
            reaffirm_interval: self.reaffirm_interval(),
            ..PresenceConfig::default()
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("oneshot") {
            Ok(Self::Oneshot)
        } else if s.eq_ignore_ascii_case("runloop") {
            Ok(Self::Runloop)
        } else {
            Err(ConfigError::UnknownProfile)
        }
    }
}

/// Parameters of the presence state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Intensity a frame must exceed to count as active
    pub threshold: Threshold,
    /// Continuous activity required to assert presence
    pub debounce: Duration,
    /// Continuous inactivity required to retract presence
    pub cooldown: Duration,
    /// Repeat the current state this often, `None` disables
    pub reaffirm_interval: Option<Duration>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::new(ONESHOT_THRESHOLD),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            reaffirm_interval: None,
        }
    }
}

impl PresenceConfig {
    /// Set the activity threshold
    pub fn with_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.threshold = threshold.into();
        self
    }

    /// Set the debounce window
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the cooldown window
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Enable or disable re-affirmations
    pub fn with_reaffirm_interval(mut self, interval: Option<Duration>) -> Self {
        self.reaffirm_interval = interval;
        self
    }

    /// Check the configuration can drive a state machine
    ///
    /// A zero debounce is allowed (presence on the second active frame); a
    /// zero cooldown is not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        duration_to_ms(self.debounce).ok_or(ConfigError::DurationOverflow { field: "debounce" })?;

        let cooldown = duration_to_ms(self.cooldown)
            .ok_or(ConfigError::DurationOverflow { field: "cooldown" })?;
        if cooldown == 0 {
            return Err(ConfigError::ZeroCooldown);
        }

        if let Some(interval) = self.reaffirm_interval {
            let interval = duration_to_ms(interval)
                .ok_or(ConfigError::DurationOverflow { field: "reaffirm_interval" })?;
            if interval == 0 {
                return Err(ConfigError::ZeroReaffirmInterval);
            }
        }

        Ok(())
    }

    pub(crate) fn debounce_ms(&self) -> u64 {
        duration_to_ms(self.debounce).unwrap_or(u64::MAX)
    }

    pub(crate) fn cooldown_ms(&self) -> u64 {
        duration_to_ms(self.cooldown).unwrap_or(u64::MAX)
    }

    pub(crate) fn reaffirm_ms(&self) -> Option<u64> {
        self.reaffirm_interval
            .map(|interval| duration_to_ms(interval).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_oneshot() {
        let config = PresenceConfig::default();
        assert_eq!(config, Profile::Oneshot.presence_config());
        assert_eq!(config.threshold.get(), 1_000_000);
        assert_eq!(config.debounce, Duration::from_secs(5));
        assert_eq!(config.cooldown, Duration::from_secs(240));
        assert!(config.reaffirm_interval.is_none());
    }

    #[test]
    fn runloop_profile() {
        let profile = Profile::Runloop;
        let config = profile.presence_config();
        assert_eq!(config.threshold.get(), 8_000_000);
        assert_eq!(config.reaffirm_interval, Some(Duration::from_secs(5)));
        assert_eq!(config.cooldown, Duration::from_secs(150));
        assert_eq!(config.debounce, Duration::from_secs(5));
        assert_eq!(profile.averaging_window(), Some(Duration::from_secs(5)));
        assert_eq!(Profile::Oneshot.averaging_window(), None);
    }

    #[test]
    fn profile_names_round_trip() {
        for profile in [Profile::Oneshot, Profile::Runloop] {
            assert_eq!(profile.name().parse::<Profile>(), Ok(profile));
        }
        assert_eq!(" RunLoop ".parse::<Profile>(), Ok(Profile::Runloop));
        assert_eq!("fast".parse::<Profile>(), Err(ConfigError::UnknownProfile));
    }

    #[test]
    fn validation() {
        assert!(PresenceConfig::default().validate().is_ok());
        assert!(PresenceConfig::default()
            .with_debounce(Duration::ZERO)
            .validate()
            .is_ok());
        assert_eq!(
            PresenceConfig::default().with_cooldown(Duration::ZERO).validate(),
            Err(ConfigError::ZeroCooldown)
        );
        assert_eq!(
            PresenceConfig::default()
                .with_reaffirm_interval(Some(Duration::ZERO))
                .validate(),
            Err(ConfigError::ZeroReaffirmInterval)
        );
        assert_eq!(
            PresenceConfig::default().with_cooldown(Duration::MAX).validate(),
            Err(ConfigError::DurationOverflow { field: "cooldown" })
        );
    }
}
