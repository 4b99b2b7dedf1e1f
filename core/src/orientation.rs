//! Vertical acceleration extraction with optional gyroscope tilt compensation.
//!
//! The phone is assumed to be mounted with its z-axis roughly vertical, so by default the
//! filtered z-axis acceleration is the vertical component. When angular rates are recorded, the
//! roll and pitch drift of the mount is tracked by integrating `wx` and `wy` and the vertical
//! component is re-projected with a small-angle approximation:
//!
//! $$
//! a_v = a_z \cos\theta_x \cos\theta_y + a_y \sin\theta_x - a_x \sin\theta_y
//! $$
//!
//! This is not a full rotation-matrix correction. It degrades for large tilts and integrates
//! with a constant step (the median sample interval) rather than the per-sample spacing.
use log::{info, warn};

use crate::filter::FilteredSequence;
use crate::stats;

/// Vertical acceleration plus bookkeeping on how it was derived.
#[derive(Clone, Debug, PartialEq)]
pub struct VerticalAcceleration {
    /// One value per filtered sample, m/s²
    pub values: Vec<f64>,
    /// True when the gyroscope correction was applied
    pub gyro_corrected: bool,
    /// Angular-rate cells that were missing and integrated as zero
    pub gyro_gaps: usize,
}

/// Vertical acceleration series aligned with the filtered samples.
pub fn vertical_component(filtered: &FilteredSequence) -> Vec<f64> {
    extract_vertical(filtered).values
}

/// Like [`vertical_component`], also reporting whether and how the tilt correction was applied.
pub fn extract_vertical(filtered: &FilteredSequence) -> VerticalAcceleration {
    let Some(gyro) = filtered.samples.gyro.as_ref() else {
        return VerticalAcceleration {
            values: filtered.az_filtered.clone(),
            gyro_corrected: false,
            gyro_gaps: 0,
        };
    };

    let dt = stats::median(&stats::diff(filtered.time())).unwrap_or(0.0);
    let mut gyro_gaps = 0;
    let mut fill = |rates: &[Option<f64>]| -> Vec<f64> {
        rates
            .iter()
            .map(|w| {
                w.unwrap_or_else(|| {
                    gyro_gaps += 1;
                    0.0
                })
            })
            .collect()
    };
    let wx = fill(&gyro.wx);
    let wy = fill(&gyro.wy);
    if gyro_gaps > 0 {
        warn!(
            "{} missing angular-rate samples integrated as zero rotation",
            gyro_gaps
        );
    }

    let angles_x = stats::cumulative_trapezoid_uniform(&wx, dt);
    let angles_y = stats::cumulative_trapezoid_uniform(&wy, dt);
    let values = filtered
        .az_filtered
        .iter()
        .zip(filtered.ay_filtered.iter())
        .zip(filtered.ax_filtered.iter())
        .zip(angles_x.iter().zip(angles_y.iter()))
        .map(|(((az, ay), ax), (theta_x, theta_y))| {
            az * theta_x.cos() * theta_y.cos() + ay * theta_x.sin() - ax * theta_y.sin()
        })
        .collect();
    info!(
        "Applied gyroscope tilt correction with a constant step of {:.4} s",
        dt
    );
    VerticalAcceleration {
        values,
        gyro_corrected: true,
        gyro_gaps,
    }
}
