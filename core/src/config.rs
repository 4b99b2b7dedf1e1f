//! Configuration for the roughness pipeline and the batch runner.
//!
//! Every numeric constant the algorithms depend on (calibration coefficients, default speed,
//! gravity, filter cutoff and order) lives in [`PipelineConfig`] so it can be recalibrated
//! without touching algorithm code. [`RunConfig`] wraps a pipeline configuration with the
//! input/output and logging settings used by the command line application, and can be read
//! from or written to TOML, JSON or YAML files.
//!
//! # Example
//!
//! ```
//! use roughness::config::PipelineConfig;
//!
//! let config = PipelineConfig {
//!     segment_length_m: 150.0,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.calibration.k, 80.59);
//! ```
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoughnessError};

/// Default spatial bin length for the estimator, meters.
pub const DEFAULT_SEGMENT_LENGTH_M: f64 = 100.0;
/// Default low-pass cutoff applied to the raw accelerometer axes, Hz.
pub const DEFAULT_CUTOFF_HZ: f64 = 10.0;
/// Default Butterworth order.
pub const DEFAULT_FILTER_ORDER: usize = 4;
/// Speed assumed for every sample when neither a speed column nor GPS fixes exist, m/s.
pub const DEFAULT_SPEED_MPS: f64 = 15.0;
/// Nominal gravitational acceleration, m/s².
pub const GRAVITY: f64 = 9.81;
/// Empirical RMS-to-IRI calibration constant (`K`).
pub const DEFAULT_IRI_K: f64 = 80.59;

/// Coefficients of the empirical conversion `iri = k · rms^accel_exponent / speed^speed_exponent`.
///
/// The defaults are placeholders pending field calibration; they are kept as-is for output parity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Calibration constant `K`
    pub k: f64,
    /// Acceleration exponent `n`
    pub accel_exponent: f64,
    /// Speed exponent `m`
    pub speed_exponent: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            k: DEFAULT_IRI_K,
            accel_exponent: 1.0,
            speed_exponent: 1.0,
        }
    }
}

/// Parameters of a single pipeline invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of each spatial segment in meters
    pub segment_length_m: f64,
    /// Low-pass cutoff frequency in Hz (clamped below Nyquist at run time)
    pub low_pass_cutoff_hz: f64,
    /// Butterworth filter order
    pub filter_order: usize,
    /// Declared sampling rate in Hz; estimated from the timestamps when absent
    pub sampling_rate_hz: Option<f64>,
    /// Fallback speed when no speed source exists, m/s
    pub default_speed_mps: f64,
    /// Gravity used to express the removed DC offset in g
    pub gravity_mps2: f64,
    /// Presentation threshold in m/km; not used by the estimator itself
    pub iri_threshold_m_per_km: Option<f64>,
    /// RMS-to-IRI conversion coefficients
    pub calibration: Calibration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            segment_length_m: DEFAULT_SEGMENT_LENGTH_M,
            low_pass_cutoff_hz: DEFAULT_CUTOFF_HZ,
            filter_order: DEFAULT_FILTER_ORDER,
            sampling_rate_hz: None,
            default_speed_mps: DEFAULT_SPEED_MPS,
            gravity_mps2: GRAVITY,
            iri_threshold_m_per_km: None,
            calibration: Calibration::default(),
        }
    }
}

impl PipelineConfig {
    /// Check that every parameter is in its valid range.
    ///
    /// Minimum segment lengths imposed by a user interface are the caller's responsibility;
    /// here the length only has to be positive and finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.segment_length_m.is_finite() && self.segment_length_m > 0.0) {
            return Err(RoughnessError::InvalidConfig(format!(
                "segment_length_m must be positive, got {}",
                self.segment_length_m
            )));
        }
        if !(self.low_pass_cutoff_hz.is_finite() && self.low_pass_cutoff_hz > 0.0) {
            return Err(RoughnessError::InvalidConfig(format!(
                "low_pass_cutoff_hz must be positive, got {}",
                self.low_pass_cutoff_hz
            )));
        }
        if self.filter_order == 0 {
            return Err(RoughnessError::InvalidConfig(
                "filter_order must be at least 1".to_string(),
            ));
        }
        if let Some(rate) = self.sampling_rate_hz {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(RoughnessError::InvalidConfig(format!(
                    "sampling_rate_hz must be positive, got {}",
                    rate
                )));
            }
        }
        if !(self.default_speed_mps.is_finite() && self.default_speed_mps >= 0.0) {
            return Err(RoughnessError::InvalidConfig(format!(
                "default_speed_mps must be non-negative, got {}",
                self.default_speed_mps
            )));
        }
        if !(self.gravity_mps2.is_finite() && self.gravity_mps2 > 0.0) {
            return Err(RoughnessError::InvalidConfig(format!(
                "gravity_mps2 must be positive, got {}",
                self.gravity_mps2
            )));
        }
        if !self.calibration.k.is_finite() {
            return Err(RoughnessError::InvalidConfig(
                "calibration.k must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging settings for the command line application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (off, error, warn, info, debug, trace)
    pub level: String,
    /// Optional log file; logs go to stderr when absent
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// A complete batch run: where to read, where to write and how to process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// CSV file or directory of CSV files
    pub input: String,
    /// Output directory for result files
    pub output: String,
    /// Process multiple files in parallel
    pub parallel: bool,
    /// Write a JSON summary next to each results CSV
    pub write_summary: bool,
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            input: "data/input.csv".to_string(),
            output: "results".to_string(),
            parallel: false,
            write_summary: true,
            logging: LoggingConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Serialization format, picked from a file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            other => Err(RoughnessError::UnsupportedConfigFormat(other.to_string())),
        }
    }
}

impl RunConfig {
    /// Read a configuration file; the format follows the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config: RunConfig = match format {
            ConfigFormat::Toml => toml::from_str(&text)?,
            ConfigFormat::Json => serde_json::from_str(&text)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&text)?,
        };
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Write the configuration to a file; the format follows the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }
}
