//! Engine configuration loaded from TOML.
//!
//! ```toml
//! [clock]
//! tick_interval_ms = 1000
//! warning_threshold_secs = 5
//!
//! [reconciliation]
//! refresh_interval_ms = 5000
//! request_timeout_ms = 10000
//!
//! [leaderboard]
//! default_sort = "tokens"      # or "accuracy"
//! tie_break = "input_order"    # or "participant"
//!
//! [runner]
//! channel_capacity = 1024
//!
//! [logging]
//! filter = "info,trivia=debug"
//! ```
//!
//! Every section and field is optional.

use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use trivia_core::SortKey;
use trivia_engine::ControllerConfig;
use trivia_leaderboard::TieBreak;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deadline clock configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Clock cadence (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Remaining seconds at or below which the clock warns
    #[serde(default = "default_warning_threshold_secs")]
    pub warning_threshold_secs: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            warning_threshold_secs: default_warning_threshold_secs(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_warning_threshold_secs() -> u64 {
    5
}

/// Reconciliation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconciliationConfig {
    /// Minimum gap between refresh queries for an unresolved round (milliseconds)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Bound on every external call (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_refresh_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Leaderboard sort key as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKeySetting {
    #[default]
    Tokens,
    Accuracy,
}

impl From<SortKeySetting> for SortKey {
    fn from(setting: SortKeySetting) -> Self {
        match setting {
            SortKeySetting::Tokens => SortKey::Tokens,
            SortKeySetting::Accuracy => SortKey::Accuracy,
        }
    }
}

/// Leaderboard tie-break as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakSetting {
    #[default]
    InputOrder,
    Participant,
}

impl From<TieBreakSetting> for TieBreak {
    fn from(setting: TieBreakSetting) -> Self {
        match setting {
            TieBreakSetting::InputOrder => TieBreak::InputOrder,
            TieBreakSetting::Participant => TieBreak::Participant,
        }
    }
}

/// Leaderboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default)]
    pub default_sort: SortKeySetting,

    #[serde(default)]
    pub tie_break: TieBreakSetting,
}

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// Capacity of the ledger and client event channels
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1024
}

impl EngineConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero intervals and capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("clock.tick_interval_ms", self.clock.tick_interval_ms),
            (
                "reconciliation.refresh_interval_ms",
                self.reconciliation.refresh_interval_ms,
            ),
            (
                "reconciliation.request_timeout_ms",
                self.reconciliation.request_timeout_ms,
            ),
            ("runner.channel_capacity", self.runner.channel_capacity as u64),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }

    /// Settings for the reconciliation controller.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            tick_interval: Duration::from_millis(self.clock.tick_interval_ms),
            warning_threshold_secs: self.clock.warning_threshold_secs,
            refresh_interval: Duration::from_millis(self.reconciliation.refresh_interval_ms),
            default_sort: self.leaderboard.default_sort.into(),
            tie_break: self.leaderboard.tie_break.into(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.reconciliation.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.clock.tick_interval_ms, 1000);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.runner.channel_capacity, 1024);
        assert_eq!(config.logging.filter, "info,trivia=debug");

        let controller = config.controller_config();
        assert_eq!(controller.refresh_interval, Duration::from_secs(5));
        assert_eq!(controller.default_sort, SortKey::Tokens);
        assert_eq!(controller.tie_break, TieBreak::InputOrder);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [leaderboard]
            default_sort = "accuracy"
            tie_break = "participant"

            [reconciliation]
            request_timeout_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.leaderboard.default_sort, SortKeySetting::Accuracy);
        assert_eq!(config.reconciliation.refresh_interval_ms, 5000);
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
        assert_eq!(config.controller_config().tie_break, TieBreak::Participant);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = EngineConfig::from_toml_str("[clock]\ntick_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("tick_interval_ms")));
    }

    #[test]
    fn test_rejects_unknown_sort_key() {
        let err = EngineConfig::from_toml_str("[leaderboard]\ndefault_sort = \"speed\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runner]\nchannel_capacity = 64").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.runner.channel_capacity, 64);

        let missing = EngineConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
