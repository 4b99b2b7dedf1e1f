//! Low-pass filtering of the raw accelerometer axes.
//!
//! Phone accelerometers pick up engine vibration, mount rattle and electrical noise well above
//! the frequencies at which a vehicle body responds to the road profile. This module removes
//! that content with a Butterworth low-pass filter applied forward and then backward
//! (zero-phase), so the filtered signal stays aligned in time with the distance axis.
//!
//! Public API:
//!     pub fn estimate_sampling_rate(time: &[f64]) -> Result<f64>
//!     pub fn butterworth_lowpass(order, cutoff_hz, sampling_rate_hz) -> Result<TransferFunction>
//!     pub fn low_pass(sequence, cutoff_hz, sampling_rate) -> Result<(FilteredSequence, f64)>
//!
//! Filter design:
//! 1) Pre-warp the cutoff: `k = tan(π · fc / fs)`
//! 2) One second-order section per conjugate pole pair of the analog prototype with
//!    `Q = 1 / (2 sin((2i + 1) π / 2N))`, plus a first-order section for odd `N`
//! 3) Bilinear transform of each section, multiplied out into a single `(b, a)` pair
//!
//! Zero-phase filtering follows the usual `filtfilt` recipe: odd extension of `3 (N + 1)`
//! samples at both ends, steady-state initial conditions scaled by the first sample of each
//! pass, forward pass, reversed second pass, and removal of the padding.
use std::f64::consts::PI;

use log::info;
use nalgebra::{DMatrix, DVector};

use crate::config::DEFAULT_FILTER_ORDER;
use crate::error::{Result, RoughnessError};
use crate::ingest::NormalizedSequence;
use crate::stats;

/// Fraction of the Nyquist frequency used when the requested cutoff is not below it.
pub const NYQUIST_CLAMP_FACTOR: f64 = 0.9;

/// Digital filter in transfer-function form, `a[0] == 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferFunction {
    /// Numerator (feed-forward) coefficients
    pub b: Vec<f64>,
    /// Denominator (feedback) coefficients
    pub a: Vec<f64>,
}

fn poly_mul(p: &[f64], q: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; p.len() + q.len() - 1];
    for (i, pi) in p.iter().enumerate() {
        for (j, qj) in q.iter().enumerate() {
            out[i + j] += pi * qj;
        }
    }
    out
}

/// Design a Butterworth low-pass filter.
///
/// # Arguments
/// * `order` - filter order (number of poles), at least 1
/// * `cutoff_hz` - -3 dB frequency, strictly between 0 and Nyquist
/// * `sampling_rate_hz` - sampling rate of the signal to be filtered
///
/// # Example
/// ```
/// use roughness::filter::butterworth_lowpass;
///
/// let tf = butterworth_lowpass(4, 10.0, 100.0).unwrap();
/// assert_eq!(tf.b.len(), 5);
/// // Unit gain at DC
/// let dc: f64 = tf.b.iter().sum::<f64>() / tf.a.iter().sum::<f64>();
/// assert!((dc - 1.0).abs() < 1e-9);
/// ```
pub fn butterworth_lowpass(
    order: usize,
    cutoff_hz: f64,
    sampling_rate_hz: f64,
) -> Result<TransferFunction> {
    let nyquist = sampling_rate_hz / 2.0;
    if order == 0 {
        return Err(RoughnessError::FilterDesign(
            "order must be at least 1".to_string(),
        ));
    }
    if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
        return Err(RoughnessError::FilterDesign(format!(
            "cutoff {} Hz must lie strictly between 0 and the Nyquist frequency {} Hz",
            cutoff_hz, nyquist
        )));
    }
    let k = (PI * cutoff_hz / sampling_rate_hz).tan();
    let k2 = k * k;
    let mut b = vec![1.0];
    let mut a = vec![1.0];
    for i in 0..order / 2 {
        let q = 1.0 / (2.0 * ((2 * i + 1) as f64 * PI / (2 * order) as f64).sin());
        let norm = 1.0 / (1.0 + k / q + k2);
        let b0 = k2 * norm;
        b = poly_mul(&b, &[b0, 2.0 * b0, b0]);
        a = poly_mul(&a, &[1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm]);
    }
    if order % 2 == 1 {
        let norm = 1.0 / (1.0 + k);
        b = poly_mul(&b, &[k * norm, k * norm]);
        a = poly_mul(&a, &[1.0, (k - 1.0) * norm]);
    }
    Ok(TransferFunction { b, a })
}

impl TransferFunction {
    pub fn order(&self) -> usize {
        self.a.len().max(self.b.len()) - 1
    }

    /// Magnitude of the frequency response at `frequency_hz`.
    pub fn gain_at(&self, frequency_hz: f64, sampling_rate_hz: f64) -> f64 {
        let w = 2.0 * PI * frequency_hz / sampling_rate_hz;
        let eval = |coeffs: &[f64]| {
            let (re, im) = coeffs
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(re, im), (k, c)| {
                    (re + c * (k as f64 * w).cos(), im - c * (k as f64 * w).sin())
                });
            (re * re + im * im).sqrt()
        };
        eval(&self.b) / eval(&self.a)
    }

    /// Filter `x` once (direct form II transposed), optionally from initial state `zi`.
    pub fn lfilter(&self, x: &[f64], zi: Option<&[f64]>) -> Vec<f64> {
        let n = self.order();
        let coeff = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0);
        let mut z = match zi {
            Some(zi) => zi.to_vec(),
            None => vec![0.0; n],
        };
        z.resize(n, 0.0);
        let mut y = Vec::with_capacity(x.len());
        for &xi in x {
            let yi = coeff(&self.b, 0) * xi + z.first().copied().unwrap_or(0.0);
            for j in 0..n {
                let next = if j + 1 < n { z[j + 1] } else { 0.0 };
                z[j] = coeff(&self.b, j + 1) * xi + next - coeff(&self.a, j + 1) * yi;
            }
            y.push(yi);
        }
        y
    }

    /// Initial state that makes the step response start in steady state.
    ///
    /// Solves `(I - Cᵀ) zi = b[1..] - a[1..] · b[0]`, with `C` the companion matrix of `a`.
    pub fn steady_state(&self) -> Result<Vec<f64>> {
        let n = self.order();
        if n == 0 {
            return Ok(Vec::new());
        }
        let coeff = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0);
        let mut system = DMatrix::<f64>::identity(n, n);
        for i in 0..n {
            system[(i, 0)] += coeff(&self.a, i + 1);
            if i + 1 < n {
                system[(i, i + 1)] -= 1.0;
            }
        }
        let b0 = coeff(&self.b, 0);
        let rhs = DVector::from_iterator(
            n,
            (1..=n).map(|i| coeff(&self.b, i) - coeff(&self.a, i) * b0),
        );
        system
            .lu()
            .solve(&rhs)
            .map(|zi| zi.iter().copied().collect())
            .ok_or_else(|| {
                RoughnessError::FilterDesign("steady-state system is singular".to_string())
            })
    }

    /// Zero-phase forward-backward filtering. The output has the same length as `x`.
    pub fn filtfilt(&self, x: &[f64]) -> Result<Vec<f64>> {
        let n = x.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let padlen = (3 * (self.order() + 1)).min(n - 1);
        let extended = odd_extension(x, padlen);
        let zi = self.steady_state()?;
        let scaled = |scale: f64| -> Vec<f64> { zi.iter().map(|z| z * scale).collect() };

        let forward = self.lfilter(&extended, Some(&scaled(extended[0])));
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let start = reversed[0];
        reversed = self.lfilter(&reversed, Some(&scaled(start)));
        reversed.reverse();
        Ok(reversed[padlen..padlen + n].to_vec())
    }
}

/// Point-symmetric extension of `x` by `padlen` samples at each end.
fn odd_extension(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));
    out
}

/// Estimate the sampling rate as the reciprocal of the median sample interval.
///
/// The median makes the estimate insensitive to occasional logging gaps.
pub fn estimate_sampling_rate(time: &[f64]) -> Result<f64> {
    if time.len() < 2 {
        return Err(RoughnessError::InsufficientSamples {
            required: 2,
            found: time.len(),
        });
    }
    let median_dt = stats::median(&stats::diff(time)).unwrap_or(0.0);
    if !(median_dt > 0.0 && median_dt.is_finite()) {
        return Err(RoughnessError::InvalidSamplingRate { median_dt });
    }
    Ok(1.0 / median_dt)
}

/// Normalized samples with low-pass filtered acceleration axes added.
///
/// The filtered columns have the same length and time axis as `samples`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilteredSequence {
    /// The unfiltered input, retained for plotting
    pub samples: NormalizedSequence,
    pub ax_filtered: Vec<f64>,
    pub ay_filtered: Vec<f64>,
    pub az_filtered: Vec<f64>,
    /// Sampling rate used for the filter design, Hz
    pub sampling_rate_hz: f64,
    /// True when the sampling rate was derived from the timestamps
    pub sampling_rate_estimated: bool,
    /// Cutoff requested by the caller, Hz
    pub requested_cutoff_hz: f64,
    /// Cutoff actually applied after clamping below Nyquist, Hz
    pub cutoff_hz: f64,
}

impl FilteredSequence {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.samples.time
    }

    pub fn cutoff_clamped(&self) -> bool {
        self.cutoff_hz != self.requested_cutoff_hz
    }
}

/// Low-pass filter the three acceleration axes with the default (4th) order.
///
/// # Arguments
/// * `sequence` - normalized samples (consumed and retained inside the result)
/// * `cutoff_hz` - requested cutoff; clamped to `0.9 × Nyquist` if at or above Nyquist
/// * `sampling_rate` - declared sampling rate, or `None` to estimate it from the timestamps
///
/// # Returns
/// The filtered sequence and the sampling rate in Hz.
pub fn low_pass(
    sequence: NormalizedSequence,
    cutoff_hz: f64,
    sampling_rate: Option<f64>,
) -> Result<(FilteredSequence, f64)> {
    low_pass_with_order(sequence, cutoff_hz, sampling_rate, DEFAULT_FILTER_ORDER)
}

/// [`low_pass`] with an explicit Butterworth order.
pub fn low_pass_with_order(
    sequence: NormalizedSequence,
    cutoff_hz: f64,
    sampling_rate: Option<f64>,
    order: usize,
) -> Result<(FilteredSequence, f64)> {
    if !(cutoff_hz.is_finite() && cutoff_hz > 0.0) {
        return Err(RoughnessError::InvalidConfig(format!(
            "low-pass cutoff must be positive, got {}",
            cutoff_hz
        )));
    }
    let (sampling_rate_hz, sampling_rate_estimated) = match sampling_rate {
        Some(rate) => (rate, false),
        None => {
            let rate = estimate_sampling_rate(&sequence.time)?;
            info!("Estimated sampling rate: {:.2} Hz", rate);
            (rate, true)
        }
    };
    let nyquist = sampling_rate_hz / 2.0;
    let applied_cutoff = if cutoff_hz >= nyquist {
        nyquist * NYQUIST_CLAMP_FACTOR
    } else {
        cutoff_hz
    };

    let tf = butterworth_lowpass(order, applied_cutoff, sampling_rate_hz)?;
    let ax_filtered = tf.filtfilt(&sequence.ax)?;
    let ay_filtered = tf.filtfilt(&sequence.ay)?;
    let az_filtered = tf.filtfilt(&sequence.az)?;
    info!(
        "Applied order-{} Butterworth low-pass at {:.2} Hz to {} samples",
        order,
        applied_cutoff,
        sequence.len()
    );

    let filtered = FilteredSequence {
        samples: sequence,
        ax_filtered,
        ay_filtered,
        az_filtered,
        sampling_rate_hz,
        sampling_rate_estimated,
        requested_cutoff_hz: cutoff_hz,
        cutoff_hz: applied_cutoff,
    };
    Ok((filtered, sampling_rate_hz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn tone(frequency_hz: f64, amplitude: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * frequency_hz * i as f64 / rate).sin())
            .collect()
    }

    fn sequence_from(time: Vec<f64>, az: Vec<f64>) -> NormalizedSequence {
        let n = time.len();
        NormalizedSequence {
            time,
            ax: vec![0.0; n],
            ay: vec![0.0; n],
            az,
            gps: None,
            speed: None,
            gyro: None,
            dropped_rows: 0,
        }
    }

    #[test]
    fn test_butterworth_coefficients_order_four() {
        // Reference: 4th-order Butterworth at 0.2 × Nyquist
        let tf = butterworth_lowpass(4, 10.0, 100.0).unwrap();
        let b = [
            0.004824343357716228,
            0.019297373430864913,
            0.02894606014629737,
            0.019297373430864913,
            0.004824343357716228,
        ];
        let a = [
            1.0,
            -2.369513007182038,
            2.313988414415881,
            -1.054665405878568,
            0.18737949236818502,
        ];
        for (x, y) in tf.b.iter().zip(b.iter()) {
            assert_approx_eq!(*x, *y, 1e-6);
        }
        for (x, y) in tf.a.iter().zip(a.iter()) {
            assert_approx_eq!(*x, *y, 1e-6);
        }
    }

    #[test]
    fn test_butterworth_half_power_at_cutoff() {
        for order in 1..=6 {
            let tf = butterworth_lowpass(order, 12.0, 100.0).unwrap();
            assert_eq!(tf.order(), order);
            assert_approx_eq!(tf.gain_at(0.0, 100.0), 1.0, 1e-9);
            assert_approx_eq!(tf.gain_at(12.0, 100.0), 1.0 / 2.0_f64.sqrt(), 1e-9);
        }
    }

    #[test]
    fn test_butterworth_rejects_cutoff_at_nyquist() {
        assert!(butterworth_lowpass(4, 50.0, 100.0).is_err());
        assert!(butterworth_lowpass(4, 0.0, 100.0).is_err());
        assert!(butterworth_lowpass(0, 10.0, 100.0).is_err());
    }

    #[test]
    fn test_steady_state_holds_constant_input() {
        let tf = butterworth_lowpass(4, 10.0, 100.0).unwrap();
        let zi = tf.steady_state().unwrap();
        let scaled: Vec<f64> = zi.iter().map(|z| z * 3.0).collect();
        let y = tf.lfilter(&[3.0; 50], Some(&scaled));
        for value in y {
            assert_approx_eq!(value, 3.0, 1e-9);
        }
    }

    #[test]
    fn test_filtfilt_preserves_constant_and_length() {
        let tf = butterworth_lowpass(4, 10.0, 100.0).unwrap();
        let x = vec![9.81; 200];
        let y = tf.filtfilt(&x).unwrap();
        assert_eq!(y.len(), x.len());
        for value in y {
            assert_approx_eq!(value, 9.81, 1e-9);
        }
    }

    #[test]
    fn test_filtfilt_short_signals() {
        let tf = butterworth_lowpass(4, 10.0, 100.0).unwrap();
        assert!(tf.filtfilt(&[]).unwrap().is_empty());
        assert_eq!(tf.filtfilt(&[2.0]).unwrap().len(), 1);
        assert_eq!(tf.filtfilt(&[1.0, 2.0, 3.0]).unwrap().len(), 3);
    }

    #[test]
    fn test_filtfilt_has_no_phase_lag() {
        // A passband tone keeps its zero crossings after zero-phase filtering.
        let rate = 100.0;
        let x = tone(1.0, 1.0, rate, 2000);
        let tf = butterworth_lowpass(4, 10.0, rate).unwrap();
        let y = tf.filtfilt(&x).unwrap();
        for i in 200..1800 {
            assert_approx_eq!(y[i], x[i], 1e-3);
        }
    }

    #[test]
    fn test_high_frequency_tone_is_attenuated() {
        let rate = 100.0;
        let n = 3000;
        let noise = tone(40.0, 1.0, rate, n);
        let tf = butterworth_lowpass(4, 10.0, rate).unwrap();
        let filtered = tf.filtfilt(&noise).unwrap();
        let raw_rms = stats::rms(&noise[300..n - 300]).unwrap();
        let filtered_rms = stats::rms(&filtered[300..n - 300]).unwrap();
        assert!(
            filtered_rms / raw_rms < 1e-3,
            "attenuation ratio {} too small",
            filtered_rms / raw_rms
        );
    }

    #[test]
    fn test_estimate_sampling_rate_uses_median() {
        let mut time: Vec<f64> = (0..101).map(|i| i as f64 * 0.01).collect();
        // One long logging gap does not move the estimate.
        for t in time.iter_mut().skip(50) {
            *t += 2.0;
        }
        assert_approx_eq!(estimate_sampling_rate(&time).unwrap(), 100.0, 1e-6);
    }

    #[test]
    fn test_estimate_sampling_rate_errors() {
        assert!(matches!(
            estimate_sampling_rate(&[0.0]),
            Err(RoughnessError::InsufficientSamples { required: 2, found: 1 })
        ));
        assert!(matches!(
            estimate_sampling_rate(&[0.0, 0.0, 0.0, 1.0]),
            Err(RoughnessError::InvalidSamplingRate { .. })
        ));
    }

    #[test]
    fn test_low_pass_clamps_cutoff_and_keeps_alignment() {
        let time: Vec<f64> = (0..500).map(|i| i as f64 * 0.02).collect();
        let az = tone(2.0, 1.0, 50.0, 500);
        let seq = sequence_from(time.clone(), az);
        let (filtered, rate) = low_pass(seq, 40.0, None).unwrap();
        assert_approx_eq!(rate, 50.0, 1e-6);
        assert!(filtered.sampling_rate_estimated);
        assert!(filtered.cutoff_clamped());
        assert_approx_eq!(filtered.cutoff_hz, 22.5, 1e-6);
        assert_eq!(filtered.len(), 500);
        assert_eq!(filtered.az_filtered.len(), 500);
        assert_eq!(filtered.time(), time.as_slice());
    }

    #[test]
    fn test_low_pass_with_declared_rate() {
        let time: Vec<f64> = (0..300).map(|i| i as f64 * 0.01).collect();
        let seq = sequence_from(time, vec![1.0; 300]);
        let (filtered, rate) = low_pass(seq, 10.0, Some(100.0)).unwrap();
        assert_eq!(rate, 100.0);
        assert!(!filtered.sampling_rate_estimated);
        assert!(!filtered.cutoff_clamped());
        assert!(low_pass(sequence_from(vec![0.0], vec![0.0]), -1.0, None).is_err());
    }
}
