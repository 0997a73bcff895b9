use chrono::{DateTime, Local, SecondsFormat};
use log::trace;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::energy::{EnergyMeasurement, EnergySource};
use crate::BenchError;

pub const CSV_HEADER: &str =
    "manager,operation,packages,run,duration_seconds,energy_joules,energy_source,notes,recorded_at";

/// One completed trial, ready to be appended to the results CSV.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub manager: String,
    pub operation: String,
    pub packages: Vec<String>,
    pub run: u32,
    pub duration_seconds: f64,
    pub energy_joules: f64,
    pub energy_source: EnergySource,
    pub notes: String,
    pub recorded_at: DateTime<Local>,
}

impl BenchmarkResult {
    pub fn new(
        manager: &str,
        packages: &[String],
        run: u32,
        measurement: &EnergyMeasurement,
    ) -> Self {
        Self {
            manager: manager.to_owned(),
            operation: "install".to_owned(),
            packages: packages.to_vec(),
            run,
            duration_seconds: measurement.duration_seconds,
            energy_joules: measurement.energy_joules,
            energy_source: measurement.source,
            notes: measurement.notes.clone(),
            recorded_at: Local::now(),
        }
    }

    // None of the fields may contain a comma: packages are joined with
    // spaces and the notes wording is fixed by the energy module.
    fn as_row(&self) -> String {
        format!(
            "{},{},{},{},{:.4},{:.4},{},{},{}",
            self.manager,
            self.operation,
            self.packages.join(" "),
            self.run,
            self.duration_seconds,
            self.energy_joules,
            self.energy_source,
            self.notes,
            self.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        )
    }
}

/// Append one result row to `output_path`, creating the file (and its parent
/// directories) with a header when needed.
pub fn append_result(result: &BenchmarkResult, output_path: &Path) -> Result<(), BenchError> {
    if output_path.exists() {
        trace!("Results file exists...");
    } else {
        trace!("Results file doesn't exist, creating...");
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        create_csv_file(output_path)?;
    }

    let mut results_file = OpenOptions::new().append(true).open(output_path)?;
    writeln!(results_file, "{}", result.as_row())?;
    Ok(())
}

fn create_csv_file(path: &Path) -> Result<(), BenchError> {
    let mut results_file = OpenOptions::new().create_new(true).write(true).open(path)?;
    writeln!(results_file, "{CSV_HEADER}")?;
    Ok(())
    // File is closed when it goes out of scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyMeasurement;
    use tempfile::TempDir;

    fn sample_result() -> BenchmarkResult {
        let measurement = EnergyMeasurement {
            duration_seconds: 5.04321,
            energy_joules: 12.34567,
            source: EnergySource::Rapl,
            notes: String::new(),
        };
        BenchmarkResult::new("pip", &["requests".to_owned(), "flask".to_owned()], 1, &measurement)
    }

    #[test]
    fn test_row_formatting() {
        let row = sample_result().as_row();
        assert!(row.starts_with("pip,install,requests flask,1,5.0432,12.3457,rapl,,"));
    }

    #[test]
    fn test_append_creates_file_with_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("results").join("results.csv");
        append_result(&sample_result(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
    }

    #[test]
    fn test_append_does_not_repeat_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("results.csv");
        append_result(&sample_result(), &path).unwrap();
        append_result(&sample_result(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("manager,").count(), 1);
    }
}
