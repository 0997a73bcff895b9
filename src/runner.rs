use log::debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::BenchError;

/// One benchmarked package manager. Each trial gets a scratch directory and
/// must leave all of its state (virtualenv, project, caches it can disable)
/// inside it, so successive runs start from the same state.
pub trait PackageManager {
    fn name(&self) -> &'static str;
    fn is_available(&self) -> bool;
    fn run_install(&self, packages: &[String], tmp_dir: &Path) -> Result<(), BenchError>;
}

/// The full set of supported runners, in reporting order.
pub fn all_runners() -> Vec<Box<dyn PackageManager>> {
    vec![Box::new(Pip), Box::new(Uv), Box::new(Poetry)]
}

/// pip install inside a fresh virtualenv.
pub struct Pip;

impl PackageManager for Pip {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn is_available(&self) -> bool {
        find_executable("pip").is_some() || find_executable("pip3").is_some()
    }

    fn run_install(&self, packages: &[String], tmp_dir: &Path) -> Result<(), BenchError> {
        let python = find_executable("python3")
            .or_else(|| find_executable("python"))
            .ok_or_else(|| BenchError::ExecutableNotFound("python3".to_owned()))?;
        let venv_dir = tmp_dir.join("venv");

        run_checked(&python, &["-m", "venv", path_str(&venv_dir)?], None)?;

        let pip_bin = venv_dir.join("bin").join("pip");
        let mut args = vec!["install", "--no-cache-dir"];
        args.extend(packages.iter().map(String::as_str));
        run_checked(&pip_bin, &args, None)
    }
}

/// uv pip install inside a fresh uv-managed virtual environment.
pub struct Uv;

impl PackageManager for Uv {
    fn name(&self) -> &'static str {
        "uv"
    }

    fn is_available(&self) -> bool {
        find_executable("uv").is_some()
    }

    fn run_install(&self, packages: &[String], tmp_dir: &Path) -> Result<(), BenchError> {
        let venv_dir = tmp_dir.join("venv");
        run_checked(Path::new("uv"), &["venv", path_str(&venv_dir)?], None)?;

        let python = venv_dir.join("bin").join("python");
        let mut args = vec!["pip", "install", "--no-cache", "-p", path_str(&python)?];
        args.extend(packages.iter().map(String::as_str));
        run_checked(Path::new("uv"), &args, None)
    }
}

/// poetry add inside a fresh minimal Poetry project.
pub struct Poetry;

impl PackageManager for Poetry {
    fn name(&self) -> &'static str {
        "poetry"
    }

    fn is_available(&self) -> bool {
        find_executable("poetry").is_some()
    }

    fn run_install(&self, packages: &[String], tmp_dir: &Path) -> Result<(), BenchError> {
        let project_dir = tmp_dir.join("project");
        fs::create_dir(&project_dir)?;
        fs::write(project_dir.join("pyproject.toml"), POETRY_PYPROJECT)?;

        let mut args = vec!["add", "--no-interaction"];
        args.extend(packages.iter().map(String::as_str));
        run_checked(Path::new("poetry"), &args, Some(&project_dir))
    }
}

// Minimal pyproject so `poetry add` has something to add to.
const POETRY_PYPROJECT: &str = r#"[tool.poetry]
name = "benchmark-project"
version = "0.1.0"
description = ""
authors = []

[tool.poetry.dependencies]
python = "^3.10"

[build-system]
requires = ["poetry-core"]
build-backend = "poetry.core.masonry.api"
"#;

/// Locate `name` on `PATH`, mimicking the shell's lookup.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Run a command to completion with captured output, failing on non-zero exit.
fn run_checked(program: &Path, args: &[&str], cwd: Option<&Path>) -> Result<(), BenchError> {
    debug!("Running: {} {}", program.display(), args.join(" "));
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let output = command.output()?;
    if !output.status.success() {
        return Err(BenchError::CommandFailed {
            command: format!("{} {}", program.display(), args.join(" ")),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

fn path_str(path: &Path) -> Result<&str, BenchError> {
    path.to_str()
        .ok_or_else(|| BenchError::BadPath(path.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_names() {
        let names: Vec<&str> = all_runners().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["pip", "uv", "poetry"]);
    }

    #[test]
    fn test_find_executable_finds_sh() {
        // sh is present on any unix box this harness targets
        assert!(find_executable("sh").is_some());
    }

    #[test]
    fn test_find_executable_misses() {
        assert!(find_executable("definitely-not-a-real-binary-42").is_none());
    }

    #[test]
    fn test_run_checked_reports_exit_code() {
        let err = run_checked(Path::new("sh"), &["-c", "exit 3"], None).unwrap_err();
        match err {
            BenchError::CommandFailed { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_checked_success() {
        assert!(run_checked(Path::new("sh"), &["-c", "true"], None).is_ok());
    }
}
