// Fitting and code generation configuration
//
// The percentile thresholds and the terminal-segment tolerance are empirical
// constants tuned against real dumps. They live here so they can be tuned from
// a TOML file without touching the detector or the formatter.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Invalid configuration values
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be in [0, 100], got {value}")]
    PercentileOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("min_fit_points must be >= 3, got {0}")]
    TooFewFitPoints(usize),

    #[error("slope_decimals must be <= 12, got {0}")]
    TooManyDecimals(u32),
}

/// Configuration for breakpoint detection, fitting and code generation
///
/// # Example
/// ```
/// use regfit::config::FitConfig;
///
/// let config = FitConfig::default();
/// assert_eq!(config.primary_percentile, 40.0);
/// assert_eq!(config.fallback_percentile, 60.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Percentile of the curvature distribution used as the first threshold
    pub primary_percentile: f64,

    /// Percentile used when the first pass finds fewer than `min_breakpoints`
    ///
    /// The retry result replaces the first pass, even when it finds nothing.
    pub fallback_percentile: f64,

    /// Breakpoints the first pass must find to avoid the retry
    pub min_breakpoints: usize,

    /// Series shorter than this are not modelled
    pub min_fit_points: usize,

    /// Segments with |slope| below this are rendered as constants
    pub flat_slope_epsilon: f64,

    /// A segment whose threshold is within this distance of the highest
    /// observed frequency is written unconditionally in the register form
    pub terminal_tolerance: f64,

    /// Decimal digits kept when printing slopes
    pub slope_decimals: u32,

    /// Macro invoked by the register-write form
    pub write_macro: String,

    /// Prefix prepended to the register name in the register-write form
    pub register_prefix: String,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            primary_percentile: 40.0,
            fallback_percentile: 60.0,
            min_breakpoints: 2,
            min_fit_points: 3,
            flat_slope_epsilon: 1e-6,
            terminal_tolerance: 1.0,
            slope_decimals: 4,
            write_macro: "WRITE_ALL_PARAM_REG".to_string(),
            register_prefix: "EMC_".to_string(),
        }
    }
}

impl FitConfig {
    /// Fewer, stronger breakpoints
    pub fn strict() -> Self {
        Self {
            primary_percentile: 60.0,
            fallback_percentile: 80.0,
            ..Self::default()
        }
    }

    /// More breakpoints, more sensitive to small slope changes
    pub fn permissive() -> Self {
        Self {
            primary_percentile: 25.0,
            fallback_percentile: 40.0,
            min_breakpoints: 1,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("primary_percentile", self.primary_percentile),
            ("fallback_percentile", self.fallback_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::PercentileOutOfRange { name, value });
            }
        }

        for (name, value) in [
            ("flat_slope_epsilon", self.flat_slope_epsilon),
            ("terminal_tolerance", self.terminal_tolerance),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if self.min_fit_points < 3 {
            return Err(ConfigError::TooFewFitPoints(self.min_fit_points));
        }

        if self.slope_decimals > 12 {
            return Err(ConfigError::TooManyDecimals(self.slope_decimals));
        }

        Ok(())
    }
}
