use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::results::CSV_HEADER;
use crate::BenchError;

/// The fields of one results row that the summary cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub manager: String,
    pub operation: String,
    pub duration_seconds: f64,
    pub energy_joules: f64,
    pub energy_source: String,
}

/// Mean ± sample standard deviation per (manager, operation) group.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub n: usize,
    pub duration_mean: f64,
    pub duration_std: f64,
    pub energy_mean: f64,
    pub energy_std: f64,
    pub sources: Vec<String>,
}

/// Keyed by (manager, operation); BTreeMap keeps the table sorted.
pub type Summary = BTreeMap<(String, String), SummaryStats>;

/// Load the results CSV written by the benchmark driver.
///
/// Rows are comma-split without quoting: the writer guarantees no field
/// contains a comma. A row with the wrong column count or a non-numeric
/// measurement is an error, not a silent skip.
pub fn load_results(path: &Path) -> Result<Vec<ResultRow>, BenchError> {
    let n_columns = CSV_HEADER.split(',').count();
    let content = fs::read_to_string(path)?;

    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if idx == 0 {
            continue; // header
        }
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != n_columns {
            return Err(BenchError::BadRow {
                line: idx + 1,
                reason: format!("expected {n_columns} columns, got {}", fields.len()),
            });
        }
        rows.push(ResultRow {
            manager: fields[0].to_owned(),
            operation: fields[1].to_owned(),
            duration_seconds: parse_field(fields[4], idx + 1, "duration_seconds")?,
            energy_joules: parse_field(fields[5], idx + 1, "energy_joules")?,
            energy_source: fields[6].to_owned(),
        });
    }
    Ok(rows)
}

fn parse_field(value: &str, line: usize, name: &str) -> Result<f64, BenchError> {
    value.parse().map_err(|_| BenchError::BadRow {
        line,
        reason: format!("non-numeric {name}: {value:?}"),
    })
}

/// Group rows by (manager, operation) and compute summary statistics.
pub fn summarize(rows: &[ResultRow]) -> Summary {
    let mut groups: BTreeMap<(String, String), Vec<&ResultRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.manager.clone(), row.operation.clone()))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|(key, entries)| {
            let durations: Vec<f64> = entries.iter().map(|r| r.duration_seconds).collect();
            let energies: Vec<f64> = entries.iter().map(|r| r.energy_joules).collect();
            let mut sources: Vec<String> =
                entries.iter().map(|r| r.energy_source.clone()).collect();
            sources.sort();
            sources.dedup();

            let stats = SummaryStats {
                n: entries.len(),
                duration_mean: mean(&durations),
                duration_std: sample_std(&durations),
                energy_mean: mean(&energies),
                energy_std: sample_std(&energies),
                sources,
            };
            (key, stats)
        })
        .collect()
}

/// Render the summary as an aligned text table.
pub fn format_table(summary: &Summary) -> String {
    let header = format!(
        "{:<12} {:<12} {:>3}  {:>16}  {:>18}  Source",
        "Manager", "Operation", "N", "Duration (s)", "Energy (J)"
    );
    let mut table = String::new();
    table.push_str(&header);
    table.push('\n');
    table.push_str(&"-".repeat(header.len()));
    table.push('\n');

    for ((manager, operation), stats) in summary {
        let dur = format!("{:.2} ± {:.2}", stats.duration_mean, stats.duration_std);
        let eng = format!("{:.4} ± {:.4}", stats.energy_mean, stats.energy_std);
        table.push_str(&format!(
            "{manager:<12} {operation:<12} {:>3}  {dur:>16}  {eng:>18}  {}\n",
            stats.n,
            stats.sources.join(", ")
        ));
    }
    table
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    variance.sqrt()
}
