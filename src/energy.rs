use glob::glob;
use lazy_static::lazy_static;
use log::{debug, trace};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

// Each RAPL package (usually one per socket) has a top-level directory here
// named intel-rapl:<n>. Sub-zones (core, uncore, dram) live underneath with a
// second colon in the name (intel-rapl:<n>:<m>) and must not be counted as
// independent packages: the package counter already includes them.
const RAPL_DIR: &str = "/sys/class/powercap";

const UJ_PER_JOULE: f64 = 1_000_000.0;

/// Assumed CPU power draw used when no hardware counter is available.
pub const DEFAULT_TDP_WATTS: f64 = 15.0;

lazy_static! {
    // Anchor for the monotonic timestamps. Wall-clock adjustments (NTP, DST)
    // must not move readings taken during one process run.
    static ref PROCESS_START: Instant = Instant::now();
}

/// A snapshot of the energy state at a point in time.
///
/// The timestamp is always present; the two signals are independently
/// optional, `None` meaning "unavailable on this machine right now" rather
/// than zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyReading {
    /// Monotonic seconds since process start.
    pub timestamp: f64,
    /// Sum of the RAPL package counters, in joules.
    pub rapl_joules: Option<f64>,
    /// Cumulative user+system CPU time of this process and its reaped
    /// children, in seconds.
    pub cpu_time_seconds: Option<f64>,
}

/// Energy and timing result for one measurement interval.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyMeasurement {
    pub duration_seconds: f64,
    pub energy_joules: f64,
    pub source: EnergySource,
    pub notes: String,
}

/// Which fallback tier produced an `EnergyMeasurement`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnergySource {
    Rapl,
    CpuTimeEstimate,
    ElapsedTimeEstimate,
}

impl Display for EnergySource {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            EnergySource::Rapl => "rapl",
            EnergySource::CpuTimeEstimate => "cpu_time_estimate",
            EnergySource::ElapsedTimeEstimate => "elapsed_time_estimate",
        };
        write!(f, "{name}")
    }
}

/// Capture the current energy state (RAPL counters + CPU time).
///
/// Never fails: a signal that cannot be read is returned as `None` and the
/// measurement degrades to an estimate tier in [`compute_energy`].
#[must_use]
pub fn take_reading() -> EnergyReading {
    take_reading_at(Path::new(RAPL_DIR))
}

fn take_reading_at(base: &Path) -> EnergyReading {
    let packages = rapl_packages(base);
    let rapl_uj = if packages.is_empty() {
        None
    } else {
        read_rapl_uj(&packages)
    };
    EnergyReading {
        timestamp: PROCESS_START.elapsed().as_secs_f64(),
        rapl_joules: rapl_uj.map(|uj| uj / UJ_PER_JOULE),
        cpu_time_seconds: read_cpu_time(),
    }
}

/// Compute the energy consumed between two readings.
///
/// Prefers the hardware counter; falls back to `cpu_time_delta × tdp_watts`,
/// then to `elapsed × tdp_watts`. The caller supplies `start` taken before
/// `end`; a reversed pair yields a negative duration, passed through as-is.
#[must_use]
pub fn compute_energy(
    start: &EnergyReading,
    end: &EnergyReading,
    tdp_watts: f64,
) -> EnergyMeasurement {
    compute_energy_at(Path::new(RAPL_DIR), start, end, tdp_watts)
}

fn compute_energy_at(
    base: &Path,
    start: &EnergyReading,
    end: &EnergyReading,
    tdp_watts: f64,
) -> EnergyMeasurement {
    let duration = end.timestamp - start.timestamp;

    if let (Some(start_j), Some(end_j)) = (start.rapl_joules, end.rapl_joules) {
        let mut delta = end_j - start_j;
        if delta < 0.0 {
            // Counter wrapped. Re-enumerate and add one full wrap range per
            // package. Only exact when a single wrap happened on exactly the
            // packages that wrapped; multi-wrap intervals are under-counted.
            delta = match read_max_range_uj(&rapl_packages(base)) {
                Some(max_uj) => delta + max_uj / UJ_PER_JOULE,
                None => delta.abs(),
            };
        }
        return EnergyMeasurement {
            duration_seconds: duration,
            energy_joules: delta,
            source: EnergySource::Rapl,
            notes: String::new(),
        };
    }

    if let (Some(start_cpu), Some(end_cpu)) = (start.cpu_time_seconds, end.cpu_time_seconds) {
        let cpu_delta = end_cpu - start_cpu;
        return EnergyMeasurement {
            duration_seconds: duration,
            energy_joules: cpu_delta * tdp_watts,
            source: EnergySource::CpuTimeEstimate,
            notes: format!("Estimated using cpu_time={cpu_delta:.3}s x tdp={tdp_watts}W"),
        };
    }

    // Last resort: elapsed time at assumed TDP, a rough upper bound.
    EnergyMeasurement {
        duration_seconds: duration,
        energy_joules: duration * tdp_watts,
        source: EnergySource::ElapsedTimeEstimate,
        notes: format!("Estimated using elapsed={duration:.3}s x tdp={tdp_watts}W (no CPU time available)"),
    }
}

/// Enumerate the top-level RAPL package directories exposing an energy
/// counter, sorted by name so repeated discovery is stable.
fn rapl_packages(base: &Path) -> Vec<PathBuf> {
    let pattern = base.join("intel-rapl:*");
    let Some(pattern) = pattern.to_str().map(str::to_owned) else {
        return Vec::new();
    };
    let Ok(entries) = glob(&pattern) else {
        return Vec::new();
    };

    let mut packages: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|p| is_package_dir(p) && p.join("energy_uj").is_file())
        .collect();
    packages.sort();
    trace!("RAPL packages: {packages:?}");
    packages
}

// intel-rapl:0 is a package, intel-rapl:0:0 is one of its sub-zones.
fn is_package_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("intel-rapl:"))
        .is_some_and(|rest| !rest.contains(':'))
}

/// Sum `energy_uj` across `packages`. An empty list sums to `Some(0.0)`; any
/// unreadable or non-numeric counter makes the whole reading `None` rather
/// than a partial sum.
fn read_rapl_uj(packages: &[PathBuf]) -> Option<f64> {
    let mut total = 0.0;
    for pkg in packages {
        total += read_counter_file(&pkg.join("energy_uj"))?;
    }
    Some(total)
}

/// Sum the declared wrap range of every package that declares one. `None`
/// when no package declares a range or a declared range cannot be parsed,
/// leaving the caller on the absolute-value correction.
fn read_max_range_uj(packages: &[PathBuf]) -> Option<f64> {
    let mut total = None;
    for pkg in packages {
        let range_file = pkg.join("max_energy_range_uj");
        if range_file.is_file() {
            total = Some(total.unwrap_or(0.0) + read_counter_file(&range_file)?);
        }
    }
    total
}

fn read_counter_file(path: &Path) -> Option<f64> {
    match fs::read_to_string(path) {
        Ok(text) => match text.trim().parse::<f64>() {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Non-numeric counter in {}: {e}", path.display());
                None
            }
        },
        Err(e) => {
            debug!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

/// Total CPU time (user + system, including reaped children) in seconds, or
/// `None` where `getrusage` is unavailable or fails.
#[cfg(unix)]
fn read_cpu_time() -> Option<f64> {
    fn usage_secs(who: libc::c_int) -> Option<f64> {
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        if unsafe { libc::getrusage(who, &mut usage) } != 0 {
            return None;
        }
        Some(timeval_secs(usage.ru_utime) + timeval_secs(usage.ru_stime))
    }

    fn timeval_secs(tv: libc::timeval) -> f64 {
        tv.tv_sec as f64 + tv.tv_usec as f64 / 1e6
    }

    Some(usage_secs(libc::RUSAGE_SELF)? + usage_secs(libc::RUSAGE_CHILDREN)?)
}

#[cfg(not(unix))]
fn read_cpu_time() -> Option<f64> {
    None
}
