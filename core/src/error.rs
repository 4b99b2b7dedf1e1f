//! Error and warning types for the roughness pipeline.
//!
//! Two families are defined here. [`RoughnessError`] is returned when a stage cannot produce
//! a result at all (required columns missing, nothing left after cleaning, a sampling rate
//! that cannot be estimated). [`DataQualityWarning`] is advisory: the pipeline substituted a
//! default, dropped rows or clamped a parameter and kept going. Warnings are collected on the
//! [`PipelineOutput`](crate::pipeline::PipelineOutput) so a caller can surface them to a user.
use thiserror::Error;

/// Fatal errors raised by the ingestion, filtering and configuration layers.
#[derive(Debug, Error)]
pub enum RoughnessError {
    /// One or more required columns are absent from the input table.
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Every row was dropped during coercion, so no duration can be defined.
    #[error("no valid rows remain after removing samples with missing time or acceleration")]
    EmptyDataset,

    #[error("at least {required} samples are required, found {found}")]
    InsufficientSamples { required: usize, found: usize },

    /// The median sample spacing is zero or negative (e.g. mostly duplicate timestamps).
    #[error("cannot derive a sampling rate from a median sample interval of {median_dt} s")]
    InvalidSamplingRate { median_dt: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("filter design failed: {0}")]
    FilterDesign(String),

    #[error("unsupported configuration file extension '{0}' (expected toml, json, yaml or yml)")]
    UnsupportedConfigFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RoughnessError>;

/// Non-fatal data-quality issues. The computation continues with a best-effort default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityWarning {
    #[error("{count} rows dropped for missing or non-numeric time/acceleration values")]
    RowsDropped { count: usize },

    #[error("sampling rate estimated from timestamps as {hz:.2} Hz")]
    SamplingRateEstimated { hz: f64 },

    #[error("low-pass cutoff {requested_hz:.2} Hz is at or above Nyquist; using {applied_hz:.2} Hz")]
    CutoffClamped { requested_hz: f64, applied_hz: f64 },

    /// No speed column and no GPS fixes: every sample was assigned the default speed.
    #[error("no speed or GPS data available; assuming a constant speed of {speed_mps:.1} m/s")]
    DefaultSpeed { speed_mps: f64 },

    #[error("{count} missing speed values filled with the previous valid value")]
    SpeedGapsFilled { count: usize },

    #[error("{count} negative speed values clamped to zero")]
    NegativeSpeedClamped { count: usize },

    #[error("{count} missing angular-rate samples integrated as zero rotation")]
    GyroGapsFilled { count: usize },

    #[error(
        "traveled distance {total_distance_m:.1} m is too short for a single {segment_length_m:.1} m segment"
    )]
    NoSegments {
        total_distance_m: f64,
        segment_length_m: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_missing_column() {
        let err = RoughnessError::Schema {
            missing: vec!["time".to_string(), "az".to_string()],
        };
        assert_eq!(err.to_string(), "missing required columns: time, az");
    }

    #[test]
    fn warnings_render_their_values() {
        let warning = DataQualityWarning::DefaultSpeed { speed_mps: 15.0 };
        assert!(warning.to_string().contains("15.0 m/s"));
        let warning = DataQualityWarning::CutoffClamped {
            requested_hz: 30.0,
            applied_hz: 22.5,
        };
        assert!(warning.to_string().contains("22.50 Hz"));
    }
}
