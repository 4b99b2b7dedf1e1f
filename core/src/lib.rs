//! Road roughness estimation from smartphone sensor recordings
//!
//! This crate turns a time series of phone accelerometer samples, optionally accompanied by GPS fixes and
//! gyroscope rates, recorded while driving a road into estimates of the International Roughness Index (IRI) in
//! meters of vertical displacement per kilometer traveled. The phone is assumed to be rigidly mounted in the
//! vehicle with its z-axis roughly vertical. Display of the data, file upload and session caching belong to the
//! calling application and are not provided here.
//!
//! The estimator is an empirical RMS approximation, not a quarter-car (golden-car) simulation. For each spatial
//! segment the RMS of the vertical acceleration is scaled by a calibration constant and divided by the mean
//! speed:
//!
//! $$
//! IRI = K \cdot \frac{\mathrm{RMS}(a_v)^n}{\bar{v}^m}, \quad K = 80.59, \; n = m = 1
//! $$
//!
//! The constants are placeholders pending field calibration and live in [`config::Calibration`] so that they can
//! be replaced without touching the algorithms.
//!
//! This crate is primarily built off of a few additional dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): linear solve for the zero-phase filter's initial conditions.
//! - [`chrono`](https://crates.io/crates/chrono): timestamp parsing.
//! - [`csv`](https://crates.io/crates/csv) and [`serde`](https://crates.io/crates/serde): input tables, result
//!   files and configuration files (TOML, JSON, YAML).
//! - [`log`](https://crates.io/crates/log): progress and data-quality reporting; the application picks the logger.
//!
//! ## Crate overview
//!
//! The modules follow the data flow, leaves first:
//! - [ingest]: schema validation, numeric coercion, time ordering and re-basing of the raw table.
//! - [gps]: haversine distance and speed reconstruction from consecutive fixes.
//! - [filter]: sampling-rate estimation and the zero-phase Butterworth low-pass filter.
//! - [orientation]: vertical acceleration, with a small-angle tilt correction when gyroscope rates exist.
//! - [distance]: speed source selection and cumulative distance.
//! - [segment]: fixed-length spatial bins over the distance axis.
//! - [iri]: per-segment estimate, condition classes and aggregate statistics.
//! - [pipeline]: the stages above chained into a single call.
//! - [config], [error], [export] and [stats]: configuration, error types, result files and numeric helpers.
//!
//! ## Usage
//!
//! ```no_run
//! use roughness::config::PipelineConfig;
//! use roughness::pipeline::run_csv;
//!
//! let config = PipelineConfig {
//!     segment_length_m: 150.0,
//!     ..Default::default()
//! };
//! let output = run_csv("./data/drive.csv", &config).expect("pipeline failed");
//! for (start, end, iri) in output.triples() {
//!     println!("{:>8.1} - {:>8.1} m: {:.2} m/km", start, end, iri);
//! }
//! ```
pub mod config;
pub mod distance;
pub mod error;
pub mod export;
pub mod filter;
pub mod gps;
pub mod ingest;
pub mod iri;
pub mod orientation;
pub mod pipeline;
pub mod segment;
pub mod stats;

pub use config::{Calibration, PipelineConfig};
pub use error::{DataQualityWarning, Result, RoughnessError};
pub use pipeline::{PipelineOutput, run, run_csv};
