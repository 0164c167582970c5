//! Filter configuration and validation
//!
//! One `FilterConfig` serves two roles: the manager-wide default handed to
//! every filter opened without overrides, and the per-filter custom config a
//! caller may pass to `create_filter`. A custom config is owned by the entry
//! it configures and is reclaimed together with it.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Configuration for filters and the manager that owns them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Directory holding one `bloomd.<name>` subdirectory per filter
    pub data_dir: PathBuf,
    /// Expected number of keys a filter is sized for
    pub initial_capacity: u64,
    /// Target false positive probability, in (0, 1)
    pub false_positive_rate: f64,
    /// Keep filters purely in memory, with no persistent backing
    pub in_memory: bool,
    /// Cadence of the background reclaimer, in milliseconds
    pub vacuum_interval_ms: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/tmp/bloomd"),
            initial_capacity: 100_000,
            false_positive_rate: 1.0 / 10_000.0, // 0.01%
            in_memory: false,
            vacuum_interval_ms: 1_000,
        }
    }
}

impl FilterConfig {
    /// Create a new configuration with validation
    pub fn new(
        data_dir: PathBuf,
        initial_capacity: u64,
        false_positive_rate: f64,
        in_memory: bool,
    ) -> Result<Self, FilterError> {
        let config = Self {
            data_dir,
            initial_capacity,
            false_positive_rate,
            in_memory,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.initial_capacity == 0 {
            return Err(FilterError::InvalidConfig(
                "initial_capacity must be at least 1".into(),
            ));
        }

        if self.false_positive_rate <= 0.0 || self.false_positive_rate >= 1.0 {
            return Err(FilterError::InvalidConfig(format!(
                "false_positive_rate {} must be in (0, 1)",
                self.false_positive_rate
            )));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(FilterError::InvalidConfig("data_dir must be set".into()));
        }

        if self.vacuum_interval_ms == 0 {
            return Err(FilterError::InvalidConfig(
                "vacuum_interval_ms must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Cadence of the background reclaimer
    pub fn vacuum_interval(&self) -> Duration {
        Duration::from_millis(self.vacuum_interval_ms)
    }
}

/// Fluent builder for [`FilterConfig`]
///
/// ```ignore
/// let config = FilterConfigBuilder::new()
///     .data_dir("/var/lib/bloomd")
///     .initial_capacity(1_000_000)
///     .false_positive_rate(0.001)
///     .build()?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct FilterConfigBuilder {
    config: FilterConfig,
}

impl FilterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn initial_capacity(mut self, capacity: u64) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    pub fn false_positive_rate(mut self, rate: f64) -> Self {
        self.config.false_positive_rate = rate;
        self
    }

    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.config.in_memory = in_memory;
        self
    }

    pub fn vacuum_interval(mut self, interval: Duration) -> Self {
        self.config.vacuum_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<FilterConfig, FilterError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = FilterConfig {
            initial_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        for rate in [0.0, 1.0, -0.5, 2.0] {
            let config = FilterConfig {
                false_positive_rate: rate,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "rate {} should fail", rate);
        }
    }

    #[test]
    fn test_builder_round_trip() {
        let config = FilterConfigBuilder::new()
            .data_dir("/data")
            .initial_capacity(500)
            .false_positive_rate(0.01)
            .in_memory(true)
            .build()
            .expect("valid config");

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.initial_capacity, 500);
        assert!(config.in_memory);
    }

    #[test]
    fn test_builder_rejects_bad_rate() {
        assert!(FilterConfigBuilder::new()
            .false_positive_rate(3.0)
            .build()
            .is_err());
    }
}
