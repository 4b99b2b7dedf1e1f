//! Tabular ingestion and normalization of raw sensor exports.
//!
//! This module provides:
//! - [`RawTable`], the in-memory form of a sensor CSV (header names plus string cells)
//! - [`normalize`], which validates the schema, coerces every column to numbers, drops rows
//!   without a usable time or acceleration value, sorts by time and re-bases time to zero
//! - [`NormalizedSequence`], the column-oriented result consumed by the rest of the pipeline
//!
//! The expected export has the columns `time, ax, ay, az` and, optionally, `latitude,
//! longitude, altitude, speed` (GPS) and `wx, wy, wz` (gyroscope). Accelerations are in
//! m/s², angular rates in rad/s, speed in m/s and positions in degrees.
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{info, warn};

use crate::error::{Result, RoughnessError};

/// Columns every input must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["time", "ax", "ay", "az"];

/// A parsed but untyped table: header names and rows of string cells.
///
/// Rows may be shorter than the header; absent cells read as missing values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable { headers, rows }
    }

    /// Reads a CSV file with a header row.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use roughness::ingest::RawTable;
    ///
    /// let table = RawTable::from_csv("./data/drive.csv").expect("failed to read CSV");
    /// println!("{} rows, columns {:?}", table.rows.len(), table.headers);
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads CSV content from any reader. Header names are trimmed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        Ok(RawTable { headers, rows })
    }

    /// Index of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|s| s.as_str())
    }
}

/// GPS columns of a normalized sequence. Cells that were not numeric are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct GpsColumns {
    /// Latitude in degrees
    pub latitude: Vec<Option<f64>>,
    /// Longitude in degrees
    pub longitude: Vec<Option<f64>>,
    /// Altitude in meters, only when the input has an `altitude` column
    pub altitude: Option<Vec<Option<f64>>>,
}

/// Angular-rate columns of a normalized sequence, rad/s.
#[derive(Clone, Debug, PartialEq)]
pub struct GyroColumns {
    pub wx: Vec<Option<f64>>,
    pub wy: Vec<Option<f64>>,
    pub wz: Vec<Option<f64>>,
}

/// Clean, time-ordered samples in structure-of-arrays form.
///
/// Invariants: all columns share one length, `time` is non-decreasing and `time[0] == 0.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedSequence {
    /// Seconds since the first retained sample
    pub time: Vec<f64>,
    pub ax: Vec<f64>,
    pub ay: Vec<f64>,
    pub az: Vec<f64>,
    pub gps: Option<GpsColumns>,
    /// Speed reported by the recorder (m/s)
    pub speed: Option<Vec<Option<f64>>>,
    pub gyro: Option<GyroColumns>,
    /// Rows removed because time or an acceleration axis was missing
    pub dropped_rows: usize,
}

impl NormalizedSequence {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Elapsed time between the first and last sample, seconds.
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Parse a numeric cell. Non-numeric, empty and `NaN` cells are missing.
pub fn coerce_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

const OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// How bare numbers in the `time` column are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericTime {
    /// Integer nanoseconds since the Unix epoch, as written by most phone sensor loggers
    EpochNanos,
    /// Decimal seconds on an arbitrary axis
    Seconds,
}

impl NumericTime {
    /// Picks the unit for a whole column: integers only means epoch nanoseconds, any
    /// fractional or exponent form means seconds.
    pub fn detect<'a, I: IntoIterator<Item = &'a str>>(cells: I) -> Self {
        let fractional = cells
            .into_iter()
            .map(str::trim)
            .any(|cell| cell.parse::<i64>().is_err() && coerce_numeric(cell).is_some());
        if fractional {
            NumericTime::Seconds
        } else {
            NumericTime::EpochNanos
        }
    }
}

/// Seconds to integer nanoseconds, `None` when the result does not fit an `i64`.
fn seconds_to_nanos(seconds: f64) -> Option<i64> {
    let nanos = (seconds * 1e9).round();
    (nanos.is_finite() && nanos >= i64::MIN as f64 && nanos < i64::MAX as f64)
        .then_some(nanos as i64)
}

/// Parse a timestamp cell into nanoseconds on a common time axis.
///
/// ISO-8601 / RFC 3339 timestamps with or without an offset are accepted (naive ones are
/// read as UTC), as are bare dates. Plain numbers are read in the given [`NumericTime`]
/// unit; values outside the representable range yield `None`.
pub fn parse_timestamp_nanos(cell: &str, unit: NumericTime) -> Option<i64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(value) = coerce_numeric(s) {
        return match unit {
            NumericTime::EpochNanos => s.parse::<i64>().ok(),
            NumericTime::Seconds => seconds_to_nanos(value),
        };
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_nanos_opt();
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return dt.timestamp_nanos_opt();
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return dt.and_utc().timestamp_nanos_opt();
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
}

fn numeric_column(table: &RawTable, name: &str) -> Option<Vec<Option<f64>>> {
    let index = table.column_index(name)?;
    Some(
        (0..table.rows.len())
            .map(|row| table.cell(row, index).and_then(coerce_numeric))
            .collect(),
    )
}

fn take_rows<T: Copy>(column: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| column[i]).collect()
}

/// Validate and normalize a raw table.
///
/// Returns the normalized sequence and its duration in seconds.
///
/// # Errors
/// * [`RoughnessError::Schema`] when any of `time, ax, ay, az` is absent
/// * [`RoughnessError::EmptyDataset`] when no row survives coercion
///
/// # Example
///
/// ```
/// use roughness::ingest::{RawTable, normalize};
///
/// let table = RawTable::new(
///     vec!["time".into(), "ax".into(), "ay".into(), "az".into()],
///     vec![
///         vec!["2024-05-01T10:00:00.50Z".into(), "0.1".into(), "0.0".into(), "9.8".into()],
///         vec!["2024-05-01T10:00:00.00Z".into(), "0.2".into(), "0.0".into(), "9.7".into()],
///         vec!["2024-05-01T10:00:01.00Z".into(), "bad".into(), "0.0".into(), "9.9".into()],
///     ],
/// );
/// let (sequence, duration) = normalize(&table).unwrap();
/// assert_eq!(sequence.time, vec![0.0, 0.5]);
/// assert_eq!(sequence.dropped_rows, 1);
/// assert_eq!(duration, 0.5);
/// ```
pub fn normalize(table: &RawTable) -> Result<(NormalizedSequence, f64)> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RoughnessError::Schema { missing });
    }
    let n_rows = table.rows.len();

    let time_index = table.column_index("time").ok_or_else(|| RoughnessError::Schema {
        missing: vec!["time".to_string()],
    })?;
    let unit = NumericTime::detect((0..n_rows).filter_map(|row| table.cell(row, time_index)));
    let time: Vec<Option<i64>> = (0..n_rows)
        .map(|row| {
            table
                .cell(row, time_index)
                .and_then(|cell| parse_timestamp_nanos(cell, unit))
        })
        .collect();
    let ax = numeric_column(table, "ax").unwrap_or_default();
    let ay = numeric_column(table, "ay").unwrap_or_default();
    let az = numeric_column(table, "az").unwrap_or_default();

    let gps = match (
        numeric_column(table, "latitude"),
        numeric_column(table, "longitude"),
    ) {
        (Some(latitude), Some(longitude)) => Some(GpsColumns {
            latitude,
            longitude,
            altitude: numeric_column(table, "altitude"),
        }),
        _ => None,
    };
    let speed = numeric_column(table, "speed");
    let gyro = match (
        numeric_column(table, "wx"),
        numeric_column(table, "wy"),
        numeric_column(table, "wz"),
    ) {
        (Some(wx), Some(wy), Some(wz)) => Some(GyroColumns { wx, wy, wz }),
        _ => None,
    };

    // Keep rows with a time and all three acceleration axes, then order them by time.
    let mut order: Vec<usize> = (0..n_rows)
        .filter(|&i| time[i].is_some() && ax[i].is_some() && ay[i].is_some() && az[i].is_some())
        .collect();
    let dropped_rows = n_rows - order.len();
    if order.is_empty() {
        return Err(RoughnessError::EmptyDataset);
    }
    order.sort_by_key(|&i| time[i]);
    if dropped_rows > 0 {
        warn!(
            "Dropped {} of {} rows with missing time or acceleration",
            dropped_rows, n_rows
        );
    }

    // Offsets between two i64 instants always fit an i128
    let origin = i128::from(time[order[0]].unwrap_or_default());
    let time: Vec<f64> = order
        .iter()
        .map(|&i| (time[i].map_or(origin, i128::from) - origin) as f64 / 1e9)
        .collect();
    let unwrap_axis = |axis: &[Option<f64>]| -> Vec<f64> {
        order.iter().map(|&i| axis[i].unwrap_or_default()).collect()
    };

    let sequence = NormalizedSequence {
        ax: unwrap_axis(&ax),
        ay: unwrap_axis(&ay),
        az: unwrap_axis(&az),
        gps: gps.map(|g| GpsColumns {
            latitude: take_rows(&g.latitude, &order),
            longitude: take_rows(&g.longitude, &order),
            altitude: g.altitude.map(|alt| take_rows(&alt, &order)),
        }),
        speed: speed.map(|s| take_rows(&s, &order)),
        gyro: gyro.map(|g| GyroColumns {
            wx: take_rows(&g.wx, &order),
            wy: take_rows(&g.wy, &order),
            wz: take_rows(&g.wz, &order),
        }),
        time,
        dropped_rows,
    };
    let duration = sequence.duration();
    info!(
        "Normalized {} valid rows spanning {:.2} s (gps: {}, speed: {}, gyro: {})",
        sequence.len(),
        duration,
        sequence.gps.is_some(),
        sequence.speed.is_some(),
        sequence.gyro.is_some()
    );
    Ok((sequence, duration))
}
