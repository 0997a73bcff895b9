pub mod cli;
pub mod driver;
pub mod energy;
pub mod results;
pub mod runner;
pub mod summary;

use thiserror::Error;

/// Failures in the trial orchestration layer. The measurement core never
/// produces these: missing energy signals degrade to estimate tiers instead.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command failed with exit code {code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("executable not found on PATH: {0}")]
    ExecutableNotFound(String),
    #[error("non-UTF-8 path: {0}")]
    BadPath(String),
    #[error("no package managers available; install pip, uv, or poetry and try again")]
    NoManagers,
    #[error("malformed results row {line}: {reason}")]
    BadRow { line: usize, reason: String },
}
