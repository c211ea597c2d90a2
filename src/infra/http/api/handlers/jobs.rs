//! Job submission and lookup.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use crate::application::templates::JobPaths;
use crate::domain::job::Job;
use crate::domain::types::{JobId, JobRequest};
use crate::infra::archive::zip_results;
use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::state::ApiState;

use super::{archive_to_api, submit_to_api};

pub async fn calculate(
    State(state): State<ApiState>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_REQUEST,
            "Request body is not a valid calculation request",
            Some(rejection.body_text()),
        )
    })?;

    let job_id = state.jobs.submit(request).map_err(submit_to_api)?;
    let job = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job.to_response()))
}

pub async fn list_jobs(State(state): State<ApiState>) -> impl IntoResponse {
    let jobs: Vec<_> = state.jobs.list_all().iter().map(Job::to_list_item).collect();
    Json(jobs)
}

pub async fn get_job(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state
        .jobs
        .get(&JobId::from(id.as_str()))
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(Json(job.to_response()))
}

/// Zip of the job's `result.xml` and `result.res`.
pub async fn download_results(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if id.is_empty()
        || !id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(ApiError::not_found("Job output directory not found"));
    }

    let paths = JobPaths::for_job(&state.work_root, &JobId::from(id.as_str()));
    let bytes = zip_results(&paths).await.map_err(archive_to_api)?;
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{id}_result.zip\""),
        ),
    ];
    Ok((headers, bytes))
}
