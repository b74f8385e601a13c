//! Exchange configuration

use crate::core::validation::{duration_millis, duration_secs, ValidationError};
use std::time::Duration;

pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETENTION_PERIOD: Duration = Duration::from_secs(345_600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(1000);

/// Timing knobs of the in-memory exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeConfig {
    /// How long a leased message stays hidden from other leasers
    pub visibility_timeout: Duration,
    /// Maximum age of a message before the sweeper removes it
    pub retention_period: Duration,
    /// Re-poll period of a suspended `lease`
    pub poll_interval: Duration,
    /// Period of the background retention sweep
    pub sweep_interval: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            retention_period: DEFAULT_RETENTION_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ExchangeConfig {
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn with_retention_period(mut self, period: Duration) -> Self {
        self.retention_period = period;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Apply `[exchange]` values on top of the current settings
    ///
    /// Accepts kebab-case keys and their camelCase spellings.
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> Result<(), ValidationError> {
        if let Some(timeout) = duration_secs(
            config,
            &["visibility-timeout-seconds", "visibilityTimeoutSeconds"],
        )? {
            self.visibility_timeout = timeout;
        }
        if let Some(period) =
            duration_secs(config, &["retention-period-seconds", "retentionPeriodSeconds"])?
        {
            self.retention_period = period;
        }
        if let Some(interval) = duration_millis(config, &["poll-interval-ms", "pollIntervalMs"])? {
            self.poll_interval = interval;
        }
        if let Some(interval) = duration_millis(config, &["sweep-interval-ms", "sweepIntervalMs"])?
        {
            self.sweep_interval = interval;
        }
        Ok(())
    }
}
