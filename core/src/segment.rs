//! Fixed-length spatial segmentation of the distance axis.
//!
//! Bins are `length` meters wide and start at 0. A bin is created for every start strictly
//! below `max_distance - length`, so the tail of the recording that cannot fill a whole bin is
//! dropped and the segments do not necessarily cover the full distance traveled.
//!
//! Bin edges are snapped to the sample whose cumulative distance is nearest to the edge (no
//! interpolation). Where samples are sparse relative to the bin length, the effective segment
//! can therefore be slightly longer or shorter than nominal.
use log::debug;

/// One spatial bin and the samples that fall inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Nominal start of the bin along the road, meters
    pub distance_start: f64,
    /// Nominal end of the bin along the road, meters
    pub distance_end: f64,
    /// Nominal bin length, meters
    pub length: f64,
    /// First sample of the bin
    pub start_index: usize,
    /// One past the last sample of the bin
    pub end_index: usize,
    /// Temporal midpoint sample, used to place the segment on a map
    pub center_index: usize,
    /// Vertical acceleration samples of the bin, m/s²
    pub vertical_accel: Vec<f64>,
    /// Speed samples of the bin, m/s
    pub speed: Vec<f64>,
}

impl Segment {
    pub fn sample_count(&self) -> usize {
        self.end_index - self.start_index
    }
}

/// Index of the sample whose distance is closest to `target`, preferring the earliest sample on
/// ties. `distance` must be non-decreasing and non-empty.
pub fn nearest_index(distance: &[f64], target: f64) -> usize {
    let above = distance.partition_point(|d| *d < target);
    if above == 0 {
        return 0;
    }
    let below_value = distance[above - 1];
    // Earliest sample sharing the value just below the target
    let below = distance.partition_point(|d| *d < below_value);
    if above == distance.len() {
        return below;
    }
    if distance[above] - target < target - below_value {
        above
    } else {
        below
    }
}

/// Split the distance axis into bins of `length` meters.
///
/// # Arguments
/// * `distance` - cumulative distance per sample, non-decreasing
/// * `vertical_accel` - vertical acceleration per sample
/// * `speed` - speed per sample
/// * `length` - bin length in meters, positive
///
/// # Example
/// ```
/// use roughness::segment::segment;
///
/// let distance: Vec<f64> = (0..=1000).map(|i| i as f64).collect();
/// let zeros = vec![0.0; distance.len()];
/// let segments = segment(&distance, &zeros, &zeros, 100.0);
/// // Bins start at 0, 100, ..., 800: the 900-1000 m tail is not emitted.
/// assert_eq!(segments.len(), 9);
/// assert_eq!(segments.last().unwrap().distance_end, 900.0);
/// ```
pub fn segment(
    distance: &[f64],
    vertical_accel: &[f64],
    speed: &[f64],
    length: f64,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let Some(&max_distance) = distance.last() else {
        return segments;
    };
    if !(length > 0.0) {
        return segments;
    }
    let limit = max_distance - length;
    let mut k = 0usize;
    loop {
        let distance_start = k as f64 * length;
        if !(distance_start < limit) {
            break;
        }
        k += 1;
        let distance_end = distance_start + length;
        let start_index = nearest_index(distance, distance_start);
        let end_index = nearest_index(distance, distance_end);
        if end_index <= start_index {
            debug!(
                "Skipping empty segment {:.1}-{:.1} m (both edges at sample {})",
                distance_start, distance_end, start_index
            );
            continue;
        }
        segments.push(Segment {
            distance_start,
            distance_end,
            length,
            start_index,
            end_index,
            center_index: start_index + (end_index - start_index) / 2,
            vertical_accel: vertical_accel[start_index..end_index].to_vec(),
            speed: speed[start_index..end_index].to_vec(),
        });
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_index_matches_linear_argmin() {
        let distance: [f64; 7] = [0.0, 0.0, 1.0, 3.0, 3.0, 3.0, 7.0];
        for target in [-1.0, 0.0, 0.4, 0.5, 2.0, 2.9, 3.0, 4.9, 5.0, 5.1, 7.0, 100.0] {
            let expected = distance
                .iter()
                .enumerate()
                .fold((0usize, f64::INFINITY), |(best, best_diff), (i, d)| {
                    let diff = (d - target).abs();
                    if diff < best_diff { (i, diff) } else { (best, best_diff) }
                })
                .0;
            assert_eq!(
                nearest_index(&distance, target),
                expected,
                "target {}",
                target
            );
        }
    }

    #[test]
    fn test_partial_tail_is_dropped() {
        let distance: Vec<f64> = (0..=1050).map(|i| i as f64).collect();
        let zeros = vec![0.0; distance.len()];
        let segments = segment(&distance, &zeros, &zeros, 100.0);
        // limit = 950 m → starts 0..=900
        assert_eq!(segments.len(), 10);
        for (i, s) in segments.iter().enumerate() {
            assert_eq!(s.distance_start, i as f64 * 100.0);
            assert_eq!(s.distance_end - s.distance_start, 100.0);
            assert_eq!(s.sample_count(), 100);
        }
        assert!(segments.last().unwrap().distance_end <= 1050.0);
    }

    #[test]
    fn test_slices_and_center_index() {
        let distance: Vec<f64> = (0..=40).map(|i| i as f64 * 5.0).collect();
        let accel: Vec<f64> = (0..=40).map(|i| i as f64).collect();
        let speed = vec![10.0; distance.len()];
        let segments = segment(&distance, &accel, &speed, 50.0);
        // max 200 m, limit 150 m → starts 0, 50, 100
        assert_eq!(segments.len(), 3);
        let second = &segments[1];
        assert_eq!((second.start_index, second.end_index), (10, 20));
        assert_eq!(second.center_index, 15);
        assert_eq!(second.vertical_accel, accel[10..20].to_vec());
        assert_eq!(second.speed.len(), 10);
    }

    #[test]
    fn test_degenerate_bins_are_skipped() {
        // A stop followed by a jump: the first bin collapses to a single sample.
        let distance = [0.0, 0.0, 0.0, 300.0];
        let zeros = [0.0; 4];
        let segments = segment(&distance, &zeros, &zeros, 100.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].distance_start, 100.0);
        assert_eq!((segments[0].start_index, segments[0].end_index), (0, 3));
    }

    #[test]
    fn test_short_or_empty_input_has_no_segments() {
        assert!(segment(&[], &[], &[], 100.0).is_empty());
        let distance = [0.0, 50.0, 100.0];
        assert!(segment(&distance, &[0.0; 3], &[0.0; 3], 100.0).is_empty());
        assert!(segment(&distance, &[0.0; 3], &[0.0; 3], 0.0).is_empty());
    }
}
