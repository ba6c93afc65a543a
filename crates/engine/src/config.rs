//! Controller configuration.

use std::time::Duration;
use trivia_clock::DEFAULT_WARNING_SECS;
use trivia_core::SortKey;
use trivia_leaderboard::TieBreak;

/// Configuration for the reconciliation controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Deadline clock cadence (default 1s).
    pub tick_interval: Duration,
    /// Remaining seconds at or below which the clock warns (default 5).
    pub warning_threshold_secs: u64,
    /// Minimum gap between refresh queries for an unresolved round
    /// (default 5s).
    pub refresh_interval: Duration,
    /// Initial leaderboard sort key.
    pub default_sort: SortKey,
    /// Ordering of leaderboard ties.
    pub tie_break: TieBreak,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            warning_threshold_secs: DEFAULT_WARNING_SECS,
            refresh_interval: Duration::from_secs(5),
            default_sort: SortKey::Tokens,
            tie_break: TieBreak::InputOrder,
        }
    }
}

impl ControllerConfig {
    /// Set the clock cadence.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the refresh interval for unresolved rounds.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the leaderboard tie-break.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Set the initial sort key.
    pub fn with_default_sort(mut self, key: SortKey) -> Self {
        self.default_sort = key;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.warning_threshold_secs, 5);
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.tie_break, TieBreak::InputOrder);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ControllerConfig::default()
            .with_refresh_interval(Duration::from_secs(2))
            .with_tie_break(TieBreak::Participant)
            .with_default_sort(SortKey::Accuracy);
        assert_eq!(config.refresh_interval, Duration::from_secs(2));
        assert_eq!(config.tie_break, TieBreak::Participant);
        assert_eq!(config.default_sort, SortKey::Accuracy);
    }
}
