//! End-to-end roughness estimation.
//!
//! [`run`] chains the stages of the crate in order:
//!
//! 1. [`ingest::normalize`]: schema check, numeric coercion, row dropping, time re-basing
//! 2. [`filter::low_pass_with_order`]: zero-phase Butterworth low-pass of `ax, ay, az`
//! 3. [`orientation::extract_vertical`]: vertical component, gyro-corrected when possible
//! 4. DC removal: the mean of the vertical series (gravity plus mounting offset) is subtracted
//! 5. [`distance::resolve_speed`] and [`distance::integrate_distance`]
//! 6. [`segment::segment`]: fixed-length spatial bins
//! 7. [`iri::estimate`] per segment and an [`IriSummary`] over all of them
//!
//! Every stage is a pure function of its inputs, so independent recordings can be processed
//! concurrently without coordination. Non-fatal data-quality issues are collected in
//! [`PipelineOutput::warnings`] instead of aborting the run.
use std::path::Path;

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::distance::{self, SpeedSource};
use crate::error::{DataQualityWarning, Result};
use crate::filter::{self, FilteredSequence};
use crate::ingest::{self, RawTable};
use crate::iri::{self, IriSummary, RoughnessClass, SegmentIri};
use crate::orientation;
use crate::segment::{self, Segment};
use crate::stats;

/// Everything a single pipeline run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    /// Per-segment estimates in distance order
    pub results: Vec<SegmentIri>,
    /// The segments the estimates were computed from
    pub segments: Vec<Segment>,
    /// Statistics over `results`, `None` when no segment was produced
    pub summary: Option<IriSummary>,
    pub sampling_rate_hz: f64,
    /// Mean of the resolved speed series, m/s
    pub mean_speed_mps: f64,
    pub duration_s: f64,
    pub total_distance_m: f64,
    /// Mean vertical acceleration removed before segmentation, m/s²
    pub dc_offset_mps2: f64,
    /// The same offset expressed in multiples of the configured gravity
    pub dc_offset_g: f64,
    pub filtered: FilteredSequence,
    /// Vertical acceleration after DC removal, m/s²
    pub vertical: Vec<f64>,
    pub speed: Vec<f64>,
    pub distance: Vec<f64>,
    pub speed_source: SpeedSource,
    pub gyro_corrected: bool,
    pub warnings: Vec<DataQualityWarning>,
}

impl PipelineOutput {
    /// Latitude/longitude of the center sample of result `index`, when GPS fixes exist there.
    pub fn segment_position(&self, index: usize) -> Option<(f64, f64)> {
        let result = self.results.get(index)?;
        let gps = self.filtered.samples.gps.as_ref()?;
        let latitude = (*gps.latitude.get(result.center_index)?)?;
        let longitude = (*gps.longitude.get(result.center_index)?)?;
        Some((latitude, longitude))
    }

    /// Results whose IRI exceeds `threshold` (m/km).
    pub fn segments_above(&self, threshold: f64) -> Vec<&SegmentIri> {
        self.results.iter().filter(|r| r.iri > threshold).collect()
    }

    /// Condition band of the mean IRI.
    pub fn classification(&self) -> Option<RoughnessClass> {
        self.summary.map(|s| s.classification())
    }

    /// `(segment_start_m, segment_end_m, iri)` for every segment.
    pub fn triples(&self) -> Vec<(f64, f64, f64)> {
        self.results
            .iter()
            .map(|r| (r.distance_start, r.distance_end, r.iri))
            .collect()
    }
}

/// Read a CSV file and run the pipeline on it.
pub fn run_csv<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<PipelineOutput> {
    let path = path.as_ref();
    info!("Reading {}", path.display());
    let table = RawTable::from_csv(path)?;
    run(&table, config)
}

/// Estimate segment IRI values for one recording.
///
/// # Arguments
/// * `table` - raw sensor table with at least `time, ax, ay, az`
/// * `config` - segment length, filter settings, fallbacks and calibration
///
/// # Returns
/// The per-segment results with the intermediate series, or the first fatal error
/// (missing columns, no valid rows, undeterminable sampling rate, invalid configuration).
pub fn run(table: &RawTable, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let mut warnings = Vec::new();

    let (sequence, duration_s) = ingest::normalize(table)?;
    if sequence.dropped_rows > 0 {
        warnings.push(DataQualityWarning::RowsDropped {
            count: sequence.dropped_rows,
        });
    }

    let (filtered, sampling_rate_hz) = filter::low_pass_with_order(
        sequence,
        config.low_pass_cutoff_hz,
        config.sampling_rate_hz,
        config.filter_order,
    )?;
    if filtered.sampling_rate_estimated {
        warnings.push(DataQualityWarning::SamplingRateEstimated {
            hz: sampling_rate_hz,
        });
    }
    if filtered.cutoff_clamped() {
        let warning = DataQualityWarning::CutoffClamped {
            requested_hz: filtered.requested_cutoff_hz,
            applied_hz: filtered.cutoff_hz,
        };
        warn!("{}", warning);
        warnings.push(warning);
    }

    let vertical = orientation::extract_vertical(&filtered);
    if vertical.gyro_gaps > 0 {
        warnings.push(DataQualityWarning::GyroGapsFilled {
            count: vertical.gyro_gaps,
        });
    }
    let dc_offset_mps2 = stats::mean(&vertical.values).unwrap_or(0.0);
    let dc_offset_g = dc_offset_mps2 / config.gravity_mps2;
    info!(
        "Removed vertical DC offset of {:.4} m/s² ({:.3} g)",
        dc_offset_mps2, dc_offset_g
    );
    let vertical_values: Vec<f64> = vertical.values.iter().map(|v| v - dc_offset_mps2).collect();

    let resolved = distance::resolve_speed(&filtered.samples, config.default_speed_mps);
    warnings.extend(resolved.warnings.iter().cloned());
    let distance = distance::integrate_distance(filtered.time(), &resolved.values);
    let total_distance_m = distance.last().copied().unwrap_or(0.0);
    let mean_speed_mps = stats::mean(&resolved.values).unwrap_or(0.0);
    info!(
        "Reconstructed {:.1} m at a mean speed of {:.2} m/s ({:?} speed)",
        total_distance_m, mean_speed_mps, resolved.source
    );

    let segments = segment::segment(
        &distance,
        &vertical_values,
        &resolved.values,
        config.segment_length_m,
    );
    if segments.is_empty() {
        let warning = DataQualityWarning::NoSegments {
            total_distance_m,
            segment_length_m: config.segment_length_m,
        };
        warn!("{}", warning);
        warnings.push(warning);
    }

    let results: Vec<SegmentIri> = segments
        .iter()
        .map(|s| iri::estimate(s, &config.calibration))
        .collect();
    let iri_values: Vec<f64> = results.iter().map(|r| r.iri).collect();
    let summary = IriSummary::from_values(&iri_values);
    if let Some(summary) = &summary {
        info!(
            "{} segments of {:.0} m: mean IRI {:.2} m/km (std {:.2}, min {:.2}, max {:.2}), {}",
            summary.count,
            config.segment_length_m,
            summary.mean,
            summary.std_dev,
            summary.min,
            summary.max,
            summary.classification()
        );
    }

    Ok(PipelineOutput {
        results,
        segments,
        summary,
        sampling_rate_hz,
        mean_speed_mps,
        duration_s,
        total_distance_m,
        dc_offset_mps2,
        dc_offset_g,
        filtered,
        vertical: vertical_values,
        speed: resolved.values,
        distance,
        speed_source: resolved.source,
        gyro_corrected: vertical.gyro_corrected,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoughnessError;
    use assert_approx_eq::assert_approx_eq;

    fn table(rows: usize, rate: f64, speed: Option<f64>) -> RawTable {
        let mut headers: Vec<String> = ["time", "ax", "ay", "az"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if speed.is_some() {
            headers.push("speed".to_string());
        }
        let rows = (0..rows)
            .map(|i| {
                let t = i as f64 / rate;
                let mut row = vec![
                    format!("{:.6}", t),
                    "0.0".to_string(),
                    "0.0".to_string(),
                    format!("{}", 9.81 + 0.5 * (2.0 * std::f64::consts::PI * 1.5 * t).sin()),
                ];
                if let Some(v) = speed {
                    row.push(format!("{}", v));
                }
                row
            })
            .collect();
        RawTable::new(headers, rows)
    }

    #[test]
    fn test_dc_offset_is_gravity() {
        let output = run(&table(6000, 100.0, Some(20.0)), &PipelineConfig::default()).unwrap();
        assert_approx_eq!(output.dc_offset_mps2, 9.81, 1e-2);
        assert_approx_eq!(output.dc_offset_g, 1.0, 1e-3);
        assert_approx_eq!(stats::mean(&output.vertical).unwrap(), 0.0, 1e-9);
        assert_eq!(output.speed_source, SpeedSource::Recorded);
        assert_approx_eq!(output.mean_speed_mps, 20.0, 1e-12);
    }

    #[test]
    fn test_series_are_aligned() {
        let output = run(&table(3000, 100.0, Some(10.0)), &PipelineConfig::default()).unwrap();
        let n = output.filtered.len();
        assert_eq!(n, 3000);
        assert_eq!(output.vertical.len(), n);
        assert_eq!(output.speed.len(), n);
        assert_eq!(output.distance.len(), n);
        assert_eq!(output.results.len(), output.segments.len());
        for (result, segment) in output.results.iter().zip(output.segments.iter()) {
            assert_eq!(result.center_index, segment.center_index);
            assert!(segment.end_index <= n);
        }
    }

    #[test]
    fn test_short_drive_has_no_segments() {
        // 2 s at 10 m/s is 20 m, less than one 100 m segment
        let output = run(&table(200, 100.0, Some(10.0)), &PipelineConfig::default()).unwrap();
        assert!(output.results.is_empty());
        assert!(output.summary.is_none());
        assert!(output.classification().is_none());
        assert!(output
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::NoSegments { .. })));
    }

    #[test]
    fn test_declared_rate_and_clamped_cutoff() {
        let config = PipelineConfig {
            low_pass_cutoff_hz: 80.0,
            sampling_rate_hz: Some(100.0),
            ..Default::default()
        };
        let output = run(&table(6000, 100.0, Some(20.0)), &config).unwrap();
        assert_eq!(output.sampling_rate_hz, 100.0);
        assert!(output.warnings.contains(&DataQualityWarning::CutoffClamped {
            requested_hz: 80.0,
            applied_hz: 45.0,
        }));
        assert!(!output
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::SamplingRateEstimated { .. })));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_ingest() {
        let config = PipelineConfig {
            segment_length_m: -5.0,
            ..Default::default()
        };
        let result = run(&RawTable::default(), &config);
        assert!(matches!(result, Err(RoughnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_threshold_and_triples() {
        let output = run(&table(6000, 100.0, Some(20.0)), &PipelineConfig::default()).unwrap();
        let triples = output.triples();
        assert_eq!(triples.len(), output.results.len());
        assert_eq!(triples[0].0, 0.0);
        assert_eq!(output.segments_above(f64::INFINITY).len(), 0);
        assert_eq!(output.segments_above(-1.0).len(), output.results.len());
        assert!(output.segment_position(0).is_none());
    }
}
