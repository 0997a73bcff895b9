mod trial;

use crate::cli::CONFIGURATION;
use crate::results::append_result;
use crate::runner::{all_runners, PackageManager};
use crate::BenchError;
use log::{error, info, warn};
use std::path::PathBuf;

/// The benchmark driver - runs the trial campaign: every selected and
/// available package manager times the configured number of repetitions,
/// appending one CSV row per completed trial. A failed install is logged
/// and skipped so one broken manager doesn't sink the whole campaign.
pub struct Driver {
    packages: Vec<String>,
    repetitions: u32,
    managers: Option<Vec<String>>,
    tdp_watts: f64,
    output: PathBuf,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    pub fn new() -> Self {
        Self {
            packages: CONFIGURATION.packages.clone(),
            repetitions: CONFIGURATION.repetitions,
            managers: CONFIGURATION.managers.clone(),
            tdp_watts: CONFIGURATION.tdp_watts,
            output: PathBuf::from(&CONFIGURATION.output),
        }
    }

    pub fn run(&self) -> Result<(), BenchError> {
        let (runners, unavailable): (Vec<_>, Vec<_>) = all_runners()
            .into_iter()
            .filter(|r| self.is_selected(r.name()))
            .partition(|r| r.is_available());

        if !unavailable.is_empty() {
            let names: Vec<&str> = unavailable.iter().map(|r| r.name()).collect();
            warn!("Skipping unavailable managers: {}", names.join(", "));
        }
        if runners.is_empty() {
            return Err(BenchError::NoManagers);
        }

        let names: Vec<&str> = runners.iter().map(|r| r.name()).collect();
        info!(
            "Benchmarking {:?} x {} repetitions x packages: {:?}",
            names, self.repetitions, self.packages
        );

        let total = runners.len() as u32 * self.repetitions;
        let mut completed = 0;
        for runner in &runners {
            for run_idx in 1..=self.repetitions {
                info!(
                    "[{}/{}] {} install run {}/{} ...",
                    completed + 1,
                    total,
                    runner.name(),
                    run_idx,
                    self.repetitions
                );
                let trial = trial::Trial::new(
                    runner.as_ref(),
                    &self.packages,
                    run_idx,
                    self.tdp_watts,
                );
                match trial.run() {
                    Ok(result) => {
                        append_result(&result, &self.output)?;
                        info!(
                            "  -> {:.2} s, {:.4} J ({})",
                            result.duration_seconds, result.energy_joules, result.energy_source
                        );
                    }
                    Err(e) => error!("  -> FAILED: {e}"),
                }
                completed += 1;
            }
        }

        info!("Results written to {}", self.output.display());
        Ok(())
    }

    fn is_selected(&self, name: &str) -> bool {
        self.managers
            .as_ref()
            .map_or(true, |selected| selected.iter().any(|m| m == name))
    }
}
