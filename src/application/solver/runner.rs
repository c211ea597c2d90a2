use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
#[cfg(not(windows))]
use std::process::Stdio;

use metrics::histogram;
use thiserror::Error;
#[cfg(not(windows))]
use tokio::process::Command;
use tracing::{info, warn};

use crate::application::templates::JobPaths;

pub const METRIC_SOLVER_RUN_MS: &str = "ladle_solver_run_ms";

/// Where the solver lives and how long one invocation may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub dir: PathBuf,
    pub exe: String,
    pub timeout: Duration,
}

impl SolverConfig {
    pub fn executable_path(&self) -> PathBuf {
        self.dir.join(&self.exe)
    }

    pub fn executable_exists(&self) -> bool {
        self.executable_path().is_file()
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver executable not found: {}", .path.display())]
    ExecutableMissing { path: PathBuf },
    #[error("failed to start solver `{}`: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("solver did not finish within {} s", .timeout.as_secs())]
    Timeout { timeout: Duration },
    #[error("solver invocation failed (exit {exit_code:?}): {stderr}")]
    Exit {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("solver reported success but wrote no output at {}", .path.display())]
    MissingOutput { path: PathBuf },
    #[error("solver wait task failed: {0}")]
    Offload(String),
}

/// Invoke the solver for one job and confirm it produced the XML result.
///
/// The process runs with the installation directory as its working
/// directory and is killed once `config.timeout` elapses.
pub async fn run_solver(config: &SolverConfig, paths: &JobPaths) -> Result<(), SolverError> {
    let started_at = Instant::now();
    let exe = config.executable_path();
    if !exe.is_file() {
        warn!(
            target = "application::solver",
            op = "solver::run",
            result = "error",
            error_code = "executable_missing",
            exe = %exe.display(),
            "Solver executable not found"
        );
        return Err(SolverError::ExecutableMissing { path: exe });
    }

    let finished = match launch(config, &exe, paths).await {
        Err(SolverError::Timeout { timeout }) => {
            warn!(
                target = "application::solver",
                op = "solver::run",
                result = "timeout",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                timeout_s = timeout.as_secs(),
                "Solver timed out and was killed"
            );
            histogram!(METRIC_SOLVER_RUN_MS)
                .record(started_at.elapsed().as_secs_f64() * 1000.0);
            return Err(SolverError::Timeout { timeout });
        }
        other => other?,
    };

    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    histogram!(METRIC_SOLVER_RUN_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

    if !finished.success {
        let Finished {
            exit_code, stderr, ..
        } = finished;
        warn!(
            target = "application::solver",
            op = "solver::run",
            result = "error",
            elapsed_ms,
            exit_code = exit_code.map(i64::from).unwrap_or(-1),
            error_code = "solver_exit",
            stderr = %stderr,
            "Solver exited unsuccessfully"
        );
        return Err(SolverError::Exit { exit_code, stderr });
    }

    ensure_output(&paths.result_xml)?;

    info!(
        target = "application::solver",
        op = "solver::run",
        result = "ok",
        elapsed_ms,
        output = %paths.result_xml.display(),
        "Solver finished"
    );
    Ok(())
}

/// How a solver process ended.
struct Finished {
    success: bool,
    exit_code: Option<i32>,
    stderr: String,
}

fn spawn_error(exe: &Path, source: io::Error) -> SolverError {
    warn!(
        target = "application::solver",
        op = "solver::run",
        result = "error",
        error_code = "spawn_solver",
        exe = %exe.display(),
        error = %source,
        "Failed to spawn solver"
    );
    if source.kind() == ErrorKind::NotFound {
        SolverError::ExecutableMissing {
            path: exe.to_path_buf(),
        }
    } else {
        SolverError::Spawn {
            path: exe.to_path_buf(),
            source,
        }
    }
}

/// Waiting happens on a separate task; when the timeout elapses that task is
/// aborted, which drops and kills the child.
#[cfg(not(windows))]
async fn launch(
    config: &SolverConfig,
    exe: &Path,
    paths: &JobPaths,
) -> Result<Finished, SolverError> {
    let mut command = Command::new(exe);
    command
        .arg("/EQUILIB")
        .arg("/MACRO")
        .arg(&paths.mac_path)
        .current_dir(&config.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| spawn_error(exe, source))?;

    info!(
        target = "application::solver",
        op = "solver::run",
        result = "spawned",
        exe = %exe.display(),
        mac = %paths.mac_path.display(),
        pid = child.id().unwrap_or_default(),
        "Solver started"
    );

    let mut wait = tokio::spawn(child.wait_with_output());
    match tokio::time::timeout(config.timeout, &mut wait).await {
        Ok(Ok(Ok(output))) => Ok(Finished {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Ok(Ok(Err(source))) => Err(SolverError::Spawn {
            path: exe.to_path_buf(),
            source,
        }),
        Ok(Err(join_err)) => Err(SolverError::Offload(join_err.to_string())),
        Err(_) => {
            wait.abort();
            let _ = wait.await;
            Err(SolverError::Timeout {
                timeout: config.timeout,
            })
        }
    }
}

/// The solver is a GUI program; it is started with its window hidden and
/// waited on from the blocking pool. It writes nothing useful to stderr.
#[cfg(windows)]
async fn launch(
    config: &SolverConfig,
    exe: &Path,
    paths: &JobPaths,
) -> Result<Finished, SolverError> {
    use super::hidden::{HiddenOutcome, run_hidden};
    use std::ffi::OsStr;

    info!(
        target = "application::solver",
        op = "solver::run",
        result = "spawned",
        exe = %exe.display(),
        mac = %paths.mac_path.display(),
        "Solver started hidden"
    );

    let program = exe.to_path_buf();
    let mac_path = paths.mac_path.clone();
    let cwd = config.dir.clone();
    let timeout = config.timeout;
    let outcome = tokio::task::spawn_blocking(move || {
        run_hidden(
            &program,
            &[
                OsStr::new("/EQUILIB"),
                OsStr::new("/MACRO"),
                mac_path.as_os_str(),
            ],
            &cwd,
            timeout,
        )
    })
    .await
    .map_err(|join_err| SolverError::Offload(join_err.to_string()))?
    .map_err(|source| spawn_error(exe, source))?;

    match outcome {
        HiddenOutcome::Exited { code } => Ok(Finished {
            success: code == 0,
            exit_code: Some(code as i32),
            stderr: String::new(),
        }),
        HiddenOutcome::TimedOut => Err(SolverError::Timeout { timeout }),
    }
}

fn ensure_output(path: &Path) -> Result<(), SolverError> {
    if path.is_file() {
        Ok(())
    } else {
        warn!(
            target = "application::solver",
            op = "solver::run",
            result = "error",
            error_code = "missing_output",
            output = %path.display(),
            "Solver exited cleanly without writing its result"
        );
        Err(SolverError::MissingOutput {
            path: path.to_path_buf(),
        })
    }
}
