//! Job record and its lifecycle.

use ladle_api_types::{JobListItem, JobResponse};
use time::OffsetDateTime;

use super::error::DomainError;
use super::types::{CalcType, CalculationResult, JobId, JobRequest, JobStatus};

/// One end-to-end additive estimate.
///
/// Status only moves `Pending → Running → {Completed, Failed}`; the transition
/// methods refuse anything else, so a terminal job can never be revisited.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    status: JobStatus,
    request: JobRequest,
    created_at: OffsetDateTime,
    started_at: Option<OffsetDateTime>,
    finished_at: Option<OffsetDateTime>,
    result: Option<CalculationResult>,
    error: Option<String>,
}

impl Job {
    pub fn new(id: JobId, request: JobRequest) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            request,
            created_at: OffsetDateTime::now_utc(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn calc_type(&self) -> CalcType {
        self.request.calc_type
    }

    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<OffsetDateTime> {
        self.finished_at
    }

    pub fn result(&self) -> Option<&CalculationResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        self.advance(JobStatus::Running)?;
        self.started_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn complete(&mut self, result: CalculationResult) -> Result<(), DomainError> {
        self.advance(JobStatus::Completed)?;
        self.result = Some(result);
        self.finished_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        self.advance(JobStatus::Failed)?;
        self.error = Some(message.into());
        self.finished_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    fn advance(&mut self, next: JobStatus) -> Result<(), DomainError> {
        let legal = matches!(
            (self.status, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        );
        if !legal {
            return Err(DomainError::transition(self.status, next));
        }
        self.status = next;
        Ok(())
    }

    pub fn to_response(&self) -> JobResponse {
        JobResponse {
            job_id: self.id.to_string(),
            status: self.status,
            calc_type: self.calc_type(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }

    pub fn to_list_item(&self) -> JobListItem {
        JobListItem {
            job_id: self.id.to_string(),
            status: self.status,
            calc_type: self.calc_type(),
            created_at: self.created_at,
        }
    }
}
