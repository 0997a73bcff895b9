use log::{trace, warn};
use tempfile::Builder;

use crate::energy::{compute_energy, take_reading};
use crate::results::BenchmarkResult;
use crate::runner::PackageManager;
use crate::BenchError;

/// One install trial: a fresh scratch directory, an energy reading either
/// side of the install, and a measurement computed from the pair. The
/// scratch directory is removed before the trial reports, so successive
/// runs start from the same state.
pub struct Trial<'a> {
    runner: &'a dyn PackageManager,
    packages: &'a [String],
    run_index: u32,
    tdp_watts: f64,
}

impl<'a> Trial<'a> {
    pub fn new(
        runner: &'a dyn PackageManager,
        packages: &'a [String],
        run_index: u32,
        tdp_watts: f64,
    ) -> Self {
        Self {
            runner,
            packages,
            run_index,
            tdp_watts,
        }
    }

    pub fn run(&self) -> Result<BenchmarkResult, BenchError> {
        let tmp_dir = Builder::new().prefix("pkgbench_").tempdir()?;
        trace!("Trial scratch dir: {:?}", tmp_dir.path());

        let start = take_reading();
        if let Err(e) = self.runner.run_install(self.packages, tmp_dir.path()) {
            warn!(
                "Install failed for {} (run {}): {e}",
                self.runner.name(),
                self.run_index
            );
            return Err(e);
        }
        let end = take_reading();

        tmp_dir.close()?;

        let measurement = compute_energy(&start, &end, self.tdp_watts);
        Ok(BenchmarkResult::new(
            self.runner.name(),
            self.packages,
            self.run_index,
            &measurement,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergySource;
    use std::path::Path;

    struct FakeRunner {
        fail: bool,
    }

    impl PackageManager for FakeRunner {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn run_install(&self, _packages: &[String], tmp_dir: &Path) -> Result<(), BenchError> {
            if self.fail {
                return Err(BenchError::CommandFailed {
                    command: "fake install".to_owned(),
                    code: 1,
                    stderr: "boom".to_owned(),
                });
            }
            std::fs::write(tmp_dir.join("marker"), "ok")?;
            Ok(())
        }
    }

    #[test]
    fn test_successful_trial_produces_result() {
        let runner = FakeRunner { fail: false };
        let packages = vec!["requests".to_owned()];
        let result = Trial::new(&runner, &packages, 2, 15.0).run().unwrap();

        assert_eq!(result.manager, "fake");
        assert_eq!(result.operation, "install");
        assert_eq!(result.run, 2);
        assert!(result.duration_seconds >= 0.0);
        // Whatever tier fired on this machine, energy must be non-negative.
        assert!(result.energy_joules >= 0.0);
        assert!(matches!(
            result.energy_source,
            EnergySource::Rapl | EnergySource::CpuTimeEstimate | EnergySource::ElapsedTimeEstimate
        ));
    }

    #[test]
    fn test_failed_install_propagates() {
        let runner = FakeRunner { fail: true };
        let packages = vec!["requests".to_owned()];
        assert!(Trial::new(&runner, &packages, 1, 15.0).run().is_err());
    }
}
