//! Per-segment roughness estimate from vertical acceleration RMS.
//!
//! The estimator is the empirical approximation
//!
//! $$
//! IRI = K \cdot \frac{\mathrm{RMS}(a_v)^n}{\bar{v}^m}
//! $$
//!
//! with `K = 80.59` and `n = m = 1` unless recalibrated through [`Calibration`]. It is not a
//! quarter-car simulation. Results are in m/km.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Calibration;
use crate::segment::Segment;
use crate::stats;

/// Roughness estimate for one segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentIri {
    pub distance_start: f64,
    pub distance_end: f64,
    pub length: f64,
    /// International Roughness Index, m/km
    pub iri: f64,
    /// Mean speed over the segment, m/s
    pub mean_speed: f64,
    /// RMS of the vertical acceleration over the segment, m/s²
    pub rms_accel: f64,
    pub center_index: usize,
}

/// Estimate the IRI of a segment.
///
/// A segment with a non-positive mean speed (vehicle stopped) is reported with `iri = 0`
/// rather than an infinite value.
///
/// # Example
/// ```
/// use roughness::config::Calibration;
/// use roughness::iri::estimate;
/// use roughness::segment::Segment;
///
/// let segment = Segment {
///     distance_start: 0.0,
///     distance_end: 100.0,
///     length: 100.0,
///     start_index: 0,
///     end_index: 2,
///     center_index: 1,
///     vertical_accel: vec![1.0, -1.0],
///     speed: vec![20.0, 20.0],
/// };
/// let result = estimate(&segment, &Calibration::default());
/// assert!((result.iri - 80.59 / 20.0).abs() < 1e-12);
/// ```
pub fn estimate(segment: &Segment, calibration: &Calibration) -> SegmentIri {
    let rms_accel = stats::rms(&segment.vertical_accel).unwrap_or(0.0);
    let mean_speed = stats::mean(&segment.speed).unwrap_or(0.0);
    let iri = if mean_speed > 0.0 {
        calibration.k * rms_accel.powf(calibration.accel_exponent)
            / mean_speed.powf(calibration.speed_exponent)
    } else {
        0.0
    };
    SegmentIri {
        distance_start: segment.distance_start,
        distance_end: segment.distance_end,
        length: segment.length,
        iri,
        mean_speed,
        rms_accel,
        center_index: segment.center_index,
    }
}

/// Qualitative road condition bands used for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoughnessClass {
    /// IRI ≤ 3 m/km
    Good,
    /// 3 < IRI ≤ 5 m/km
    Fair,
    /// 5 < IRI ≤ 7 m/km
    Poor,
    /// IRI > 7 m/km
    Bad,
}

impl RoughnessClass {
    pub fn from_iri(iri: f64) -> Self {
        if iri <= 3.0 {
            RoughnessClass::Good
        } else if iri <= 5.0 {
            RoughnessClass::Fair
        } else if iri <= 7.0 {
            RoughnessClass::Poor
        } else {
            RoughnessClass::Bad
        }
    }
}

impl fmt::Display for RoughnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoughnessClass::Good => "Good",
            RoughnessClass::Fair => "Fair",
            RoughnessClass::Poor => "Poor",
            RoughnessClass::Bad => "Bad",
        };
        write!(f, "{}", label)
    }
}

/// Aggregate statistics over the segment IRI values of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IriSummary {
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl IriSummary {
    /// Summarize a list of IRI values, `None` when the list is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = stats::mean(values)?;
        let std_dev = stats::std_dev(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(IriSummary {
            mean,
            std_dev,
            min,
            max,
            count: values.len(),
        })
    }

    pub fn classification(&self) -> RoughnessClass {
        RoughnessClass::from_iri(self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn segment(vertical_accel: Vec<f64>, speed: Vec<f64>) -> Segment {
        let n = vertical_accel.len();
        Segment {
            distance_start: 200.0,
            distance_end: 300.0,
            length: 100.0,
            start_index: 10,
            end_index: 10 + n,
            center_index: 10 + n / 2,
            vertical_accel,
            speed,
        }
    }

    #[test]
    fn test_rms_and_mean_speed() {
        let result = estimate(
            &segment(vec![3.0, -4.0, 3.0, -4.0], vec![10.0, 20.0, 10.0, 20.0]),
            &Calibration::default(),
        );
        assert_approx_eq!(result.rms_accel, 12.5_f64.sqrt(), 1e-12);
        assert_approx_eq!(result.mean_speed, 15.0, 1e-12);
        assert_approx_eq!(result.iri, 80.59 * 12.5_f64.sqrt() / 15.0, 1e-12);
        assert_eq!(result.distance_start, 200.0);
        assert_eq!(result.center_index, 12);
    }

    #[test]
    fn test_stopped_segment_reports_zero() {
        let result = estimate(&segment(vec![2.0, -2.0], vec![0.0, 0.0]), &Calibration::default());
        assert_eq!(result.iri, 0.0);
        assert_approx_eq!(result.rms_accel, 2.0, 1e-12);
    }

    #[test]
    fn test_smooth_segment_is_zero() {
        let result = estimate(&segment(vec![0.0; 50], vec![20.0; 50]), &Calibration::default());
        assert_eq!(result.iri, 0.0);
    }

    #[test]
    fn test_custom_exponents() {
        let calibration = Calibration {
            k: 10.0,
            accel_exponent: 2.0,
            speed_exponent: 0.5,
        };
        let result = estimate(&segment(vec![2.0, -2.0], vec![16.0, 16.0]), &calibration);
        assert_approx_eq!(result.iri, 10.0 * 4.0 / 4.0, 1e-12);
    }

    #[test]
    fn test_classification_bands() {
        assert_eq!(RoughnessClass::from_iri(0.0), RoughnessClass::Good);
        assert_eq!(RoughnessClass::from_iri(3.0), RoughnessClass::Good);
        assert_eq!(RoughnessClass::from_iri(3.01), RoughnessClass::Fair);
        assert_eq!(RoughnessClass::from_iri(5.0), RoughnessClass::Fair);
        assert_eq!(RoughnessClass::from_iri(7.0), RoughnessClass::Poor);
        assert_eq!(RoughnessClass::from_iri(7.5), RoughnessClass::Bad);
        assert_eq!(RoughnessClass::Poor.to_string(), "Poor");
    }

    #[test]
    fn test_summary() {
        assert!(IriSummary::from_values(&[]).is_none());
        let summary = IriSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_approx_eq!(summary.mean, 5.0);
        assert_approx_eq!(summary.std_dev, 2.0);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert_eq!(summary.count, 8);
        assert_eq!(summary.classification(), RoughnessClass::Fair);
    }
}
