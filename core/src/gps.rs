//! Speed reconstruction from consecutive GPS fixes.
//!
//! When a recording has latitude/longitude but no usable speed column, speed is recovered from
//! the great-circle distance between consecutive fixes divided by the elapsed time.
use crate::ingest::NormalizedSequence;

/// Earth's mean radius in meters
pub const MEAN_RADIUS: f64 = 6_371_000.0;

/// Calculate the haversine distance between two points on Earth's surface.
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in meters
///
/// # Example
/// ```
/// use roughness::gps::haversine_distance;
///
/// let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
/// assert!((d - 111_195.0).abs() < 1.0);
/// ```
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    MEAN_RADIUS * c
}

/// Estimate instantaneous speed (m/s) from latitude/longitude.
///
/// Returns `None` when the sequence has no GPS columns. The first sample has speed 0. When the
/// elapsed time since the previous sample is not positive, or either fix is missing, the
/// previous speed is repeated instead of dividing by zero, which under-reports abrupt speed
/// changes at duplicate timestamps.
pub fn speed_from_gps(sequence: &NormalizedSequence) -> Option<Vec<f64>> {
    let gps = sequence.gps.as_ref()?;
    let n = sequence.len();
    let mut speeds = Vec::with_capacity(n);
    if n == 0 {
        return Some(speeds);
    }
    speeds.push(0.0);
    for i in 1..n {
        let previous = speeds[i - 1];
        let dt = sequence.time[i] - sequence.time[i - 1];
        let fixes = (
            gps.latitude[i - 1],
            gps.longitude[i - 1],
            gps.latitude[i],
            gps.longitude[i],
        );
        let speed = match fixes {
            (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) if dt > 0.0 => {
                haversine_distance(lat1, lon1, lat2, lon2) / dt
            }
            _ => previous,
        };
        speeds.push(speed);
    }
    Some(speeds)
}
