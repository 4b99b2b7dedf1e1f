//! Numeric helpers shared by the pipeline stages.
//!
//! Public API:
//!     pub fn mean(values: &[f64]) -> Option<f64>
//!     pub fn median(values: &[f64]) -> Option<f64>
//!     pub fn std_dev(values: &[f64]) -> Option<f64>
//!     pub fn rms(values: &[f64]) -> Option<f64>
//!     pub fn diff(values: &[f64]) -> Vec<f64>
//!     pub fn cumulative_trapezoid(y: &[f64], x: &[f64]) -> Vec<f64>
//!     pub fn cumulative_trapezoid_uniform(y: &[f64], dx: f64) -> Vec<f64>
//!
//! All reductions return `None` for an empty slice instead of producing `NaN`.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the values. For an even count the two middle values are averaged.
///
/// `NaN` entries are ordered with `f64::total_cmp`, so callers should filter them first.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Population standard deviation (divides by `N`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Root mean square: `sqrt(mean(x²))`.
pub fn rms(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean_square = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
    Some(mean_square.sqrt())
}

/// First differences `values[i + 1] - values[i]`.
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Cumulative trapezoidal integral of `y` over the sample points `x`, starting at zero.
///
/// The output has the same length as the input. Slices of unequal length are integrated
/// over their common prefix.
pub fn cumulative_trapezoid(y: &[f64], x: &[f64]) -> Vec<f64> {
    let n = y.len().min(x.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    let mut acc = 0.0;
    out.push(acc);
    for i in 1..n {
        acc += 0.5 * (y[i - 1] + y[i]) * (x[i] - x[i - 1]);
        out.push(acc);
    }
    out
}

/// Cumulative trapezoidal integral of `y` with a constant spacing `dx`, starting at zero.
pub fn cumulative_trapezoid_uniform(y: &[f64], dx: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(y.len());
    if y.is_empty() {
        return out;
    }
    let mut acc = 0.0;
    out.push(acc);
    for w in y.windows(2) {
        acc += 0.5 * (w[0] + w[1]) * dx;
        out.push(acc);
    }
    out
}
