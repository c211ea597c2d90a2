use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinError;

use crate::application::results::ParseError;
use crate::application::solver::{ProcessRunner, RunError, SolverError};
use crate::application::templates::{RenderError, TemplateRenderer};
use crate::domain::types::{CalculationResult, JobId, JobRequest};

/// Failure of one job; the `Display` text becomes the job's error field.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("input generation failed: {0}")]
    Render(#[from] RenderError),
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),
    #[error("result parsing failed: {0}")]
    Parse(#[from] ParseError),
    #[error("job execution aborted: {0}")]
    Aborted(String),
}

impl JobError {
    /// Failure for an execution task that panicked or was cancelled.
    pub fn aborted(error: JoinError) -> Self {
        if !error.is_panic() {
            return Self::Aborted(error.to_string());
        }
        let payload = error.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        Self::Aborted(format!("panicked: {message}"))
    }
}

impl From<RunError> for JobError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Solver(err) => JobError::Solver(err),
            RunError::Parse(err) => JobError::Parse(err),
        }
    }
}

/// Work performed for a dequeued job.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(
        &self,
        job_id: &JobId,
        request: &JobRequest,
    ) -> Result<CalculationResult, JobError>;
}

/// Render → run → parse.
pub struct CalculationPipeline {
    renderer: Arc<TemplateRenderer>,
    runner: Arc<ProcessRunner>,
}

impl CalculationPipeline {
    pub fn new(renderer: Arc<TemplateRenderer>, runner: Arc<ProcessRunner>) -> Self {
        Self { renderer, runner }
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }
}

#[async_trait]
impl JobExecutor for CalculationPipeline {
    async fn execute(
        &self,
        job_id: &JobId,
        request: &JobRequest,
    ) -> Result<CalculationResult, JobError> {
        let paths = self.renderer.render(job_id, request).await?;
        Ok(self.runner.run(&paths, request).await?)
    }
}
