//! Result files: per-segment CSV and a JSON run summary.
//!
//! The CSV layout is one row per segment with the columns
//! `segment_id, distance_start, distance_end, segment_length, iri_value, mean_speed, rms_accel`,
//! `segment_id` counting from 1.
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::SpeedSource;
use crate::error::Result;
use crate::iri::{IriSummary, RoughnessClass};
use crate::pipeline::PipelineOutput;

/// One row of the results CSV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IriRecord {
    pub segment_id: usize,
    pub distance_start: f64,
    pub distance_end: f64,
    pub segment_length: f64,
    pub iri_value: f64,
    pub mean_speed: f64,
    pub rms_accel: f64,
}

impl IriRecord {
    /// Build the CSV rows for a pipeline run.
    pub fn from_output(output: &PipelineOutput) -> Vec<Self> {
        output
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| IriRecord {
                segment_id: i + 1,
                distance_start: r.distance_start,
                distance_end: r.distance_end,
                segment_length: r.length,
                iri_value: r.iri,
                mean_speed: r.mean_speed,
                rms_accel: r.rms_accel,
            })
            .collect()
    }

    /// Writes a slice of records to a CSV file with a header row.
    pub fn to_csv<P: AsRef<Path>>(records: &[Self], path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        Self::to_writer(records, file)
    }

    pub fn to_writer<W: Write>(records: &[Self], writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a results CSV back, e.g. to compare two runs.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Self>> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for result in rdr.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }
}

/// Scalar outputs of a run, written next to the results CSV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Input file, when the run came from a file
    pub source: Option<String>,
    pub segment_length_m: f64,
    pub segment_count: usize,
    pub iri: Option<IriSummary>,
    pub classification: Option<RoughnessClass>,
    pub sampling_rate_hz: f64,
    pub cutoff_hz: f64,
    pub mean_speed_mps: f64,
    pub duration_s: f64,
    pub total_distance_m: f64,
    pub dc_offset_mps2: f64,
    pub dc_offset_g: f64,
    pub speed_source: SpeedSource,
    pub gyro_corrected: bool,
    /// Segments above the configured IRI threshold, if one was given
    pub iri_threshold_m_per_km: Option<f64>,
    pub segments_above_threshold: Option<usize>,
    /// Rendered data-quality warnings
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new(
        output: &PipelineOutput,
        segment_length_m: f64,
        iri_threshold_m_per_km: Option<f64>,
        source: Option<String>,
    ) -> Self {
        RunSummary {
            source,
            segment_length_m,
            segment_count: output.results.len(),
            iri: output.summary,
            classification: output.classification(),
            sampling_rate_hz: output.sampling_rate_hz,
            cutoff_hz: output.filtered.cutoff_hz,
            mean_speed_mps: output.mean_speed_mps,
            duration_s: output.duration_s,
            total_distance_m: output.total_distance_m,
            dc_offset_mps2: output.dc_offset_mps2,
            dc_offset_g: output.dc_offset_g,
            speed_source: output.speed_source,
            gyro_corrected: output.gyro_corrected,
            iri_threshold_m_per_km,
            segments_above_threshold: iri_threshold_m_per_km
                .map(|threshold| output.segments_above(threshold).len()),
            warnings: output.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }

    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
