//! Turning rendered input files into a calculation result.

#[cfg(windows)]
mod hidden;
pub mod mock;
pub mod runner;

use std::time::Duration;

use thiserror::Error;

use crate::application::results::{ParseError, parse_result_file};
use crate::application::templates::JobPaths;
use crate::domain::types::{CalculationResult, JobRequest};

pub use runner::{METRIC_SOLVER_RUN_MS, SolverConfig, SolverError};

#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    Solver(SolverConfig),
    Mock { delay: Duration },
}

impl RunMode {
    pub fn is_mock(&self) -> bool {
        matches!(self, RunMode::Mock { .. })
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    mode: RunMode,
}

impl ProcessRunner {
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    pub async fn run(
        &self,
        paths: &JobPaths,
        request: &JobRequest,
    ) -> Result<CalculationResult, RunError> {
        match &self.mode {
            RunMode::Mock { delay } => Ok(mock::run_mock(request, *delay).await),
            RunMode::Solver(config) => {
                runner::run_solver(config, paths).await?;
                Ok(parse_result_file(&paths.result_xml, &request.solve_species).await?)
            }
        }
    }
}
