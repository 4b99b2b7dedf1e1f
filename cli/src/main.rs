//! ROUGHNESS: batch estimation of the International Roughness Index from smartphone sensor logs.
//!
//! Each input CSV holds one recording with the columns `time, ax, ay, az` and optionally
//! `latitude, longitude, altitude, speed` and `wx, wy, wz`. For every recording the program writes
//! `<stem>_iri.csv` with one row per road segment and, unless disabled, `<stem>_summary.json`
//! with the run statistics and data-quality warnings.
//!
//! You can run the estimator either by:
//!   1. Loading all parameters from a configuration file (TOML/JSON/YAML)
//!   2. Specifying parameters via command-line flags

mod common;

use clap::{Args, Parser, Subcommand};
use common::{get_csv_files, init_logger, output_paths, validate_output_path};
use log::{error, info, warn};
use rayon::prelude::*;
use roughness::config::{DEFAULT_CUTOFF_HZ, DEFAULT_FILTER_ORDER, PipelineConfig, RunConfig};
use roughness::export::{IriRecord, RunSummary};
use roughness::pipeline::run_csv;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Shortest segment the application accepts, meters.
const MIN_SEGMENT_LENGTH_M: f64 = 100.0;
/// Segment length used when none is given on the command line, meters.
const CLI_SEGMENT_LENGTH_M: f64 = 150.0;

const LONG_ABOUT: &str =
    "ROUGHNESS: batch estimation of the International Roughness Index (IRI) from smartphone sensor logs.

Each recording is low-pass filtered, reduced to its vertical acceleration, split into fixed-length
road segments using the recorded speed (or GPS track), and every segment is given an empirical IRI
estimate in m/km together with a condition class (Good, Fair, Poor, Bad).

You can run the estimator either by:
  1. Loading all parameters from a configuration file (TOML/JSON/YAML)
  2. Specifying parameters via command-line flags";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Estimate road roughness (IRI) from smartphone sensor logs.", long_about = LONG_ABOUT)]
struct Cli {
    /// Run from a configuration file (TOML/JSON/YAML)
    /// This option overrides any subcommand arguments
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Command to execute (ignored if --config is provided)
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Process recordings in parallel when the input is a directory
    #[arg(long, global = true)]
    parallel: bool,
}

/// Top-level commands
#[derive(Subcommand, Clone)]
enum Command {
    #[command(
        name = "run",
        about = "Estimate segment IRI values for one or more recordings",
        long_about = "Estimate segment IRI values for a CSV recording or for every CSV file in a directory. Results are written to the output directory as <stem>_iri.csv and <stem>_summary.json."
    )]
    Run(RunArgs),

    #[command(name = "config", about = "Generate a template configuration file")]
    CreateConfig(CreateConfigArgs),
}

/// Arguments of the `run` command
#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// Input CSV file path or directory containing CSV files
    #[arg(short, long, value_parser)]
    input: PathBuf,

    /// Output directory for result files
    #[arg(short, long, value_parser)]
    output: PathBuf,

    /// Segment length in meters (at least 100)
    #[arg(short = 'l', long, default_value_t = CLI_SEGMENT_LENGTH_M, value_parser = parse_segment_length)]
    segment_length: f64,

    /// Low-pass cutoff frequency in Hz
    #[arg(long, default_value_t = DEFAULT_CUTOFF_HZ)]
    cutoff: f64,

    /// Butterworth filter order
    #[arg(long, default_value_t = DEFAULT_FILTER_ORDER)]
    filter_order: usize,

    /// Sampling rate in Hz (estimated from the timestamps if omitted)
    #[arg(long)]
    sampling_rate: Option<f64>,

    /// Report segments whose IRI exceeds this value (m/km)
    #[arg(long)]
    iri_threshold: Option<f64>,

    /// Do not write the JSON summary
    #[arg(long)]
    no_summary: bool,
}

impl RunArgs {
    fn to_config(&self, parallel: bool, logging: roughness::config::LoggingConfig) -> RunConfig {
        RunConfig {
            input: self.input.to_string_lossy().into_owned(),
            output: self.output.to_string_lossy().into_owned(),
            parallel,
            write_summary: !self.no_summary,
            logging,
            pipeline: PipelineConfig {
                segment_length_m: self.segment_length,
                low_pass_cutoff_hz: self.cutoff,
                filter_order: self.filter_order,
                sampling_rate_hz: self.sampling_rate,
                iri_threshold_m_per_km: self.iri_threshold,
                ..Default::default()
            },
        }
    }
}

/// Arguments of the `config` command
#[derive(Args, Clone, Debug)]
struct CreateConfigArgs {
    /// Output file path; the format follows the extension (.toml, .json, .yaml)
    #[arg(short, long, default_value = "roughness.toml")]
    output: PathBuf,
}

fn parse_segment_length(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    check_segment_length(value)?;
    Ok(value)
}

fn check_segment_length(value: f64) -> Result<(), String> {
    if !(value >= MIN_SEGMENT_LENGTH_M) || !value.is_finite() {
        return Err(format!(
            "segment length must be at least {} m, got {}",
            MIN_SEGMENT_LENGTH_M, value
        ));
    }
    Ok(())
}

/// Process a single CSV file with the given configuration
fn process_file(
    input_file: &Path,
    output: &Path,
    config: &RunConfig,
) -> Result<(), Box<dyn Error>> {
    info!("Processing file: {}", input_file.display());
    let result = run_csv(input_file, &config.pipeline)?;
    let (csv_path, summary_path) = output_paths(input_file, output)?;

    let records = IriRecord::from_output(&result);
    IriRecord::to_csv(&records, &csv_path)?;
    info!("{} segment results written to {}", records.len(), csv_path.display());

    match &result.summary {
        Some(summary) => info!(
            "{}: mean IRI {:.2} m/km (std {:.2}, min {:.2}, max {:.2}) over {:.1} km, road condition {}",
            input_file.display(),
            summary.mean,
            summary.std_dev,
            summary.min,
            summary.max,
            result.total_distance_m / 1000.0,
            summary.classification()
        ),
        None => warn!(
            "{}: no complete {:.0} m segment in {:.1} m of travel",
            input_file.display(),
            config.pipeline.segment_length_m,
            result.total_distance_m
        ),
    }

    if let Some(threshold) = config.pipeline.iri_threshold_m_per_km {
        let above = result.segments_above(threshold);
        info!(
            "{} of {} segments above {:.2} m/km",
            above.len(),
            result.results.len(),
            threshold
        );
        for segment in above {
            info!(
                "  {:>8.1} - {:>8.1} m: {:.2} m/km",
                segment.distance_start, segment.distance_end, segment.iri
            );
        }
    }

    if config.write_summary {
        let summary = RunSummary::new(
            &result,
            config.pipeline.segment_length_m,
            config.pipeline.iri_threshold_m_per_km,
            Some(input_file.display().to_string()),
        );
        summary.to_json(&summary_path)?;
        info!("Summary written to {}", summary_path.display());
    }
    Ok(())
}

/// Process every recording named by the configuration
fn process_all(config: &RunConfig) -> Result<(), Box<dyn Error>> {
    check_segment_length(config.pipeline.segment_length_m)?;
    config.pipeline.validate()?;

    let input = Path::new(&config.input);
    let output = Path::new(&config.output);
    validate_output_path(output)?;

    let csv_files = get_csv_files(input)?;
    let is_multiple = csv_files.len() > 1;
    if is_multiple {
        info!("Processing {} CSV files from directory", csv_files.len());
        if config.parallel {
            info!("Running in parallel mode");
        }
    }

    let failures: Vec<(PathBuf, String)> = if config.parallel && is_multiple {
        let errors = Mutex::new(Vec::new());
        csv_files.par_iter().for_each(|input_file| {
            if let Err(e) = process_file(input_file, output, config) {
                error!("Error processing {}: {}", input_file.display(), e);
                let mut errors = errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                errors.push((input_file.clone(), e.to_string()));
            }
        });
        errors
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    } else {
        let mut errors = Vec::new();
        for input_file in &csv_files {
            if let Err(e) = process_file(input_file, output, config) {
                if !is_multiple {
                    return Err(e);
                }
                error!("Error processing {}: {}", input_file.display(), e);
                errors.push((input_file.clone(), e.to_string()));
            }
        }
        errors
    };

    if !failures.is_empty() {
        error!("{} file(s) failed to process", failures.len());
        for (file, err) in &failures {
            error!("  {}: {}", file.display(), err);
        }
        return Err(format!("{} file(s) failed to process", failures.len()).into());
    }
    Ok(())
}

/// Execute a batch run from a configuration file
fn run_from_config(mut config: RunConfig, cli_parallel: bool) -> Result<(), Box<dyn Error>> {
    if cli_parallel {
        config.parallel = true;
    }
    info!("Input: {}", config.input);
    info!("Output: {}", config.output);
    info!("Parallel: {}", config.parallel);
    info!(
        "Segment length: {} m, cutoff: {} Hz",
        config.pipeline.segment_length_m, config.pipeline.low_pass_cutoff_hz
    );
    process_all(&config)
}

fn create_config_file(args: &CreateConfigArgs) -> Result<(), Box<dyn Error>> {
    let config = RunConfig {
        pipeline: PipelineConfig {
            segment_length_m: CLI_SEGMENT_LENGTH_M,
            ..Default::default()
        },
        ..Default::default()
    };
    config.to_file(&args.output)?;
    println!("Configuration template written to {}", args.output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(ref config_path) = cli.config {
        // Logging preferences come from the file; an explicit --log-file wins
        let config = RunConfig::from_file(config_path)?;
        let config_log_file = config.logging.file.as_ref().map(PathBuf::from);
        let log_file = cli.log_file.as_deref().or(config_log_file.as_deref());
        init_logger(&config.logging.level, log_file)?;
        info!("Loaded configuration from {}", config_path.display());
        return run_from_config(config, cli.parallel);
    }

    init_logger(&cli.log_level, cli.log_file.as_deref())?;

    match cli.command {
        Some(Command::Run(args)) => {
            let logging = roughness::config::LoggingConfig {
                level: cli.log_level.clone(),
                file: cli.log_file.as_ref().map(|p| p.display().to_string()),
            };
            process_all(&args.to_config(cli.parallel, logging))
        }
        Some(Command::CreateConfig(args)) => create_config_file(&args),
        None => {
            eprintln!("Error: No command provided. Use -h or --help for usage information.");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use tempfile::tempdir;

    fn write_drive(path: &Path, seconds: usize, amplitude: f64) {
        let mut text = String::from("time,ax,ay,az,speed\n");
        for i in 0..seconds * 100 {
            let t = i as f64 / 100.0;
            let az = 9.81 + amplitude * (2.0 * std::f64::consts::PI * 2.0 * t).sin();
            writeln!(text, "{:.2},0.0,0.0,{},20.0", t, az).unwrap();
        }
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_segment_length_minimum() {
        assert_eq!(parse_segment_length("150").unwrap(), 150.0);
        assert_eq!(parse_segment_length("100").unwrap(), 100.0);
        assert!(parse_segment_length("99.9").is_err());
        assert!(parse_segment_length("NaN").is_err());
        assert!(parse_segment_length("long").is_err());
    }

    #[test]
    fn test_run_command_parsing() {
        let cli = Cli::try_parse_from([
            "roughness",
            "--parallel",
            "run",
            "-i",
            "data",
            "-o",
            "out",
            "--iri-threshold",
            "4.5",
        ])
        .unwrap();
        assert!(cli.parallel);
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.segment_length, CLI_SEGMENT_LENGTH_M);
        let config = args.to_config(true, Default::default());
        assert_eq!(config.pipeline.segment_length_m, 150.0);
        assert_eq!(config.pipeline.iri_threshold_m_per_km, Some(4.5));
        assert_eq!(config.pipeline.low_pass_cutoff_hz, DEFAULT_CUTOFF_HZ);
        assert!(config.write_summary);

        let short =
            Cli::try_parse_from(["roughness", "run", "-i", "a.csv", "-o", "out", "-l", "50"]);
        assert!(short.is_err());
    }

    #[test]
    fn test_process_directory_writes_results() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("drives");
        std::fs::create_dir(&input).unwrap();
        write_drive(&input.join("smooth.csv"), 60, 0.1);
        write_drive(&input.join("rough.csv"), 60, 2.0);
        let output = dir.path().join("results");

        let config = RunConfig {
            input: input.display().to_string(),
            output: output.display().to_string(),
            parallel: true,
            pipeline: PipelineConfig {
                iri_threshold_m_per_km: Some(3.0),
                ..Default::default()
            },
            ..Default::default()
        };
        process_all(&config).unwrap();

        // 1199.8 m at 100 m per segment
        let smooth = IriRecord::from_csv(output.join("smooth_iri.csv")).unwrap();
        let rough = IriRecord::from_csv(output.join("rough_iri.csv")).unwrap();
        assert_eq!(smooth.len(), 11);
        assert_eq!(rough.len(), 11);
        assert!(rough[5].iri_value > smooth[5].iri_value * 10.0);

        let summary = RunSummary::from_json(output.join("rough_summary.json")).unwrap();
        assert_eq!(summary.segments_above_threshold, Some(11));
    }

    #[test]
    fn test_failed_file_is_reported() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.csv");
        std::fs::write(&input, "timestamp,ax,ay,az\n0,0,0,9.81\n").unwrap();
        let config = RunConfig {
            input: input.display().to_string(),
            output: dir.path().join("out").display().to_string(),
            ..Default::default()
        };
        let err = process_all(&config).unwrap_err();
        assert!(err.to_string().contains("time"));
    }

    #[test]
    fn test_config_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("template.yaml");
        create_config_file(&CreateConfigArgs {
            output: path.clone(),
        })
        .unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.pipeline.segment_length_m, CLI_SEGMENT_LENGTH_M);
        assert!(config.write_summary);
    }
}
