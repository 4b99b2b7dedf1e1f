//! Speed resolution and distance reconstruction.
//!
//! Distance along the road is the running trapezoidal integral of speed over time. Speed comes
//! from the first available source:
//! 1. the recorder's own `speed` column,
//! 2. speeds derived from consecutive GPS fixes ([`crate::gps::speed_from_gps`]),
//! 3. a constant default speed, which is reported as a data-quality warning.
//!
//! Whatever the source, the resolved series contains no missing and no negative values, so the
//! distance series is non-decreasing.
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::DataQualityWarning;
use crate::gps::speed_from_gps;
use crate::ingest::NormalizedSequence;
use crate::stats;

/// Where the speed series came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSource {
    /// The `speed` column of the recording
    Recorded,
    /// Haversine distance between consecutive GPS fixes
    Gps,
    /// Constant fallback value
    Default,
}

/// Speed per sample plus the data-quality issues found while building it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSpeed {
    /// Speed in m/s, one value per sample, never negative
    pub values: Vec<f64>,
    pub source: SpeedSource,
    pub warnings: Vec<DataQualityWarning>,
}

/// Pick the best available speed source for the sequence.
///
/// Missing cells of a recorded speed column are forward-filled (zero before the first valid
/// value) and negative values, which phone apps log as `-1` without a fix, are clamped to zero.
pub fn resolve_speed(sequence: &NormalizedSequence, default_speed_mps: f64) -> ResolvedSpeed {
    let mut warnings = Vec::new();
    let (raw, source) = if let Some(recorded) = sequence.speed.as_ref() {
        let mut gaps = 0;
        let mut last = 0.0;
        let values: Vec<f64> = recorded
            .iter()
            .map(|cell| match cell {
                Some(v) => {
                    last = *v;
                    *v
                }
                None => {
                    gaps += 1;
                    last
                }
            })
            .collect();
        if gaps > 0 {
            warnings.push(DataQualityWarning::SpeedGapsFilled { count: gaps });
        }
        (values, SpeedSource::Recorded)
    } else if let Some(values) = speed_from_gps(sequence) {
        (values, SpeedSource::Gps)
    } else {
        warnings.push(DataQualityWarning::DefaultSpeed {
            speed_mps: default_speed_mps,
        });
        (vec![default_speed_mps; sequence.len()], SpeedSource::Default)
    };

    let negatives = raw.iter().filter(|v| **v < 0.0).count();
    if negatives > 0 {
        warnings.push(DataQualityWarning::NegativeSpeedClamped { count: negatives });
    }
    let values = raw.into_iter().map(|v: f64| v.max(0.0)).collect();
    for warning in &warnings {
        warn!("{}", warning);
    }
    ResolvedSpeed {
        values,
        source,
        warnings,
    }
}

/// Cumulative distance traveled, meters, with the first value fixed at zero.
///
/// # Example
/// ```
/// use roughness::distance::integrate_distance;
///
/// let time = [0.0, 1.0, 2.0, 3.0];
/// let speed = [10.0, 10.0, 20.0, 20.0];
/// assert_eq!(integrate_distance(&time, &speed), vec![0.0, 10.0, 25.0, 45.0]);
/// ```
pub fn integrate_distance(time: &[f64], speed: &[f64]) -> Vec<f64> {
    stats::cumulative_trapezoid(speed, time)
}
