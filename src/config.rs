// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide settings for bootlog.
//!
//! Configuration is read once, either from the environment on first use or from a
//! [`Config`] installed by the application before anything is logged.  Every setting
//! has a default, and malformed values fall back to the default rather than failing:
//! diagnostics about startup must not themselves stop startup.
//!
//! | Variable                   | Meaning                                  | Default            |
//! |----------------------------|------------------------------------------|--------------------|
//! | `BOOTLOG_PROCESS_NAME`     | name stamped in every record header      | executable name    |
//! | `BOOTLOG_TIMESTAMP_FORMAT` | `round-trip` or `millis`                 | `round-trip`       |
//! | `BOOTLOG_MINIMUM_LEVEL`    | minimum level of the console host        | `information`      |
//! | `BOOTLOG_ENVIRONMENT`      | environment name exposed to hosts        | `Production`       |
//!
//! # Example
//!
//! ```
//! use bootlog::{Config, Level};
//!
//! let config = Config::from_lookup(|key| match key {
//!     "BOOTLOG_PROCESS_NAME" => Some("orders-service".to_string()),
//!     "BOOTLOG_MINIMUM_LEVEL" => Some("debug".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.process_name, "orders-service");
//! assert_eq!(config.minimum_level, Level::Debug);
//! ```

use crate::Level;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::OnceLock;

pub const PROCESS_NAME_VAR: &str = "BOOTLOG_PROCESS_NAME";
pub const TIMESTAMP_FORMAT_VAR: &str = "BOOTLOG_TIMESTAMP_FORMAT";
pub const MINIMUM_LEVEL_VAR: &str = "BOOTLOG_MINIMUM_LEVEL";
pub const ENVIRONMENT_VAR: &str = "BOOTLOG_ENVIRONMENT";

const DEFAULT_ENVIRONMENT: &str = "Production";

static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// How record headers render the creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampFormat {
    /// `2024-05-01T09:30:00.1234567+00:00`: sortable, and parses back to the same instant.
    #[default]
    RoundTrip,
    /// `2024-05-01T09:30:00.123Z`
    Millis,
}

impl TimestampFormat {
    pub fn format(self, time: DateTime<Utc>) -> String {
        match self {
            TimestampFormat::RoundTrip => {
                //seven fractional digits; leap-second nanos can exceed one second
                let ticks = time.timestamp_subsec_nanos().min(999_999_999) / 100;
                format!("{}.{:07}+00:00", time.format("%Y-%m-%dT%H:%M:%S"), ticks)
            }
            TimestampFormat::Millis => time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "round-trip" | "roundtrip" | "o" => Some(TimestampFormat::RoundTrip),
            "millis" | "ms" => Some(TimestampFormat::Millis),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub process_name: String,
    pub timestamp_format: TimestampFormat,
    /// Minimum level of a freshly created console host.  Terminal replay ignores this
    /// and always runs at [`Level::Trace`].
    pub minimum_level: Level,
    pub environment: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to defaults
    /// for missing or malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        Config {
            process_name: lookup(PROCESS_NAME_VAR)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.process_name),
            timestamp_format: lookup(TIMESTAMP_FORMAT_VAR)
                .and_then(|value| TimestampFormat::parse(&value))
                .unwrap_or(defaults.timestamp_format),
            minimum_level: lookup(MINIMUM_LEVEL_VAR)
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.minimum_level),
            environment: lookup(ENVIRONMENT_VAR)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.environment),
        }
    }

    /**
    The process-wide configuration.

    Initialized from the environment the first time it is needed unless [Config::install]
    ran earlier.
    */
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::from_env)
    }

    /**
    Installs `config` as the process-wide configuration.

    This only works before the first call to [Config::global], which happens as soon as
    anything is logged.  If a configuration is already in place, `config` is handed back.
    */
    pub fn install(config: Config) -> Result<(), Config> {
        GLOBAL_CONFIG.set(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            process_name: executable_name(),
            timestamp_format: TimestampFormat::default(),
            minimum_level: Level::default(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn missing_values_use_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.timestamp_format, TimestampFormat::RoundTrip);
        assert_eq!(config.minimum_level, Level::Information);
        assert_eq!(config.environment, "Production");
        assert!(!config.process_name.is_empty());
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = Config::from_lookup(|key| match key {
            MINIMUM_LEVEL_VAR => Some("loud".to_string()),
            TIMESTAMP_FORMAT_VAR => Some("sundial".to_string()),
            PROCESS_NAME_VAR => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.minimum_level, Level::Information);
        assert_eq!(config.timestamp_format, TimestampFormat::RoundTrip);
        assert_eq!(config.process_name, Config::default().process_name);
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(|key| match key {
            PROCESS_NAME_VAR => Some("svc".to_string()),
            TIMESTAMP_FORMAT_VAR => Some("millis".to_string()),
            MINIMUM_LEVEL_VAR => Some("crit".to_string()),
            ENVIRONMENT_VAR => Some("Staging".to_string()),
            _ => None,
        });
        assert_eq!(config.process_name, "svc");
        assert_eq!(config.timestamp_format, TimestampFormat::Millis);
        assert_eq!(config.minimum_level, Level::Critical);
        assert_eq!(config.environment, "Staging");
    }

    #[test]
    fn round_trip_timestamps_have_seven_fraction_digits() {
        let time = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(
            TimestampFormat::RoundTrip.format(time),
            "2024-05-01T09:30:00.1234567+00:00"
        );
        assert_eq!(
            TimestampFormat::Millis.format(time),
            "2024-05-01T09:30:00.123Z"
        );
    }

    #[test]
    fn round_trip_timestamps_parse_back() {
        let now = Utc::now();
        let formatted = TimestampFormat::RoundTrip.format(now);
        let parsed = DateTime::parse_from_rfc3339(&formatted).unwrap();
        let drift = now.signed_duration_since(parsed.with_timezone(&Utc));
        assert!(drift.num_microseconds().unwrap().abs() < 1);
    }
}
