//! Shared helpers for the command line application.
//!
//! - Logger initialization
//! - Path validation and CSV file discovery
//! - Output file naming

use std::error::Error;
use std::path::{Path, PathBuf};

/// Sets up `env_logger` for a batch of recordings.
///
/// Each line carries a timestamp, the level, the worker thread (so interleaved output from
/// `--parallel` runs can be told apart) and the pipeline stage that emitted it. Lines go to
/// stderr, or are appended to `log_file` when one is given.
pub fn init_logger(log_level: &str, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using 'info'", log_level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        let thread = std::thread::current();
        writeln!(
            buf,
            "{} {:<5} [{}] {}: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            thread.name().unwrap_or("main"),
            stage_label(record.target()),
            record.args()
        )
    });

    if let Some(path) = log_file {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

/// Short name of the module that logged a record: `roughness::filter` becomes `filter`,
/// the binary itself becomes `cli`.
fn stage_label(target: &str) -> &str {
    match target.strip_prefix("roughness::") {
        Some(stage) => stage,
        None if target == "roughness" => "cli",
        None => target,
    }
}

/// What an input path points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Recording,
    Directory,
}

/// Classify the input path, failing when it is missing or is neither a file nor a directory.
pub fn validate_input_path(input: &Path) -> Result<InputKind, Box<dyn Error>> {
    if input.is_file() {
        Ok(InputKind::Recording)
    } else if input.is_dir() {
        Ok(InputKind::Directory)
    } else if input.exists() {
        Err(format!("Input '{}' is neither a recording nor a directory.", input.display()).into())
    } else {
        Err(format!("Input '{}' does not exist.", input.display()).into())
    }
}

/// Get all CSV files from a path (either a single file or every CSV in a directory).
///
/// # Returns
/// The CSV files found, sorted by path.
///
/// # Errors
/// Returns an error if the input file is not a CSV or a directory holds no CSV files.
pub fn get_csv_files(input: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    match validate_input_path(input)? {
        InputKind::Recording => {
            if !is_csv(input) {
                return Err(format!("Input file '{}' is not a CSV file.", input.display()).into());
            }
            Ok(vec![input.to_path_buf()])
        }
        InputKind::Directory => {
            let mut csv_files: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_csv(path))
                .collect();
            if csv_files.is_empty() {
                return Err(
                    format!("No CSV files found in directory '{}'.", input.display()).into(),
                );
            }
            csv_files.sort();
            Ok(csv_files)
        }
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Create the output directory if it does not exist yet.
pub fn validate_output_path(output: &Path) -> Result<(), Box<dyn Error>> {
    if !output.exists() {
        std::fs::create_dir_all(output)?;
    }
    if !output.is_dir() {
        return Err(format!("Output path '{}' is not a directory.", output.display()).into());
    }
    Ok(())
}

/// Result file paths for an input recording: `<stem>_iri.csv` and `<stem>_summary.json`.
pub fn output_paths(
    input_file: &Path,
    output: &Path,
) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    let stem = input_file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| format!("Input file path '{}' has no file name", input_file.display()))?;
    Ok((
        output.join(format!("{}_iri.csv", stem)),
        output.join(format!("{}_summary.json", stem)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_validate_input_path_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("drive.csv");
        File::create(&file_path).unwrap();
        assert_eq!(validate_input_path(&file_path).unwrap(), InputKind::Recording);
        assert_eq!(validate_input_path(dir.path()).unwrap(), InputKind::Directory);
    }

    #[test]
    fn test_stage_label() {
        assert_eq!(stage_label("roughness::filter"), "filter");
        assert_eq!(stage_label("roughness"), "cli");
        assert_eq!(stage_label("rayon_core"), "rayon_core");
    }

    #[test]
    fn test_validate_input_path_nonexistent() {
        let dir = tempdir().unwrap();
        assert!(validate_input_path(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_get_csv_files_directory() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.csv")).unwrap();
        File::create(dir.path().join("a.CSV")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap(); // ignored

        let result = get_csv_files(dir.path()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].file_name().unwrap(), "a.CSV");
        assert_eq!(result[1].file_name().unwrap(), "b.csv");
    }

    #[test]
    fn test_get_csv_files_rejects_other_files() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("drive.txt");
        File::create(&file_path).unwrap();
        assert!(get_csv_files(&file_path).is_err());
        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(get_csv_files(&empty).is_err());
    }

    #[test]
    fn test_validate_output_path_creates_directory() {
        let dir = tempdir().unwrap();
        let new_dir = dir.path().join("results").join("run1");
        assert!(!new_dir.exists());
        validate_output_path(&new_dir).unwrap();
        assert!(new_dir.is_dir());
    }

    #[test]
    fn test_output_paths_use_input_stem() {
        let (csv, json) =
            output_paths(Path::new("data/morning_drive.csv"), Path::new("out")).unwrap();
        assert_eq!(csv, PathBuf::from("out/morning_drive_iri.csv"));
        assert_eq!(json, PathBuf::from("out/morning_drive_summary.json"));
    }
}
