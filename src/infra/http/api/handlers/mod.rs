//! API handlers organized by resource.
//!
//! Error conversion helpers shared by the resource modules live here.

mod catalog;
mod info;
mod jobs;
mod presets;

pub use catalog::*;
pub use info::*;
pub use jobs::*;
pub use presets::*;

use axum::http::StatusCode;

use crate::application::error::ErrorReport;
use crate::application::job_manager::SubmitError;
use crate::domain::error::ValidationError;
use crate::infra::archive::ArchiveError;
use crate::infra::presets::PresetError;

use super::error::{ApiError, codes};

fn validation_to_api(err: ValidationError) -> ApiError {
    let hint = Some(err.to_string());
    match err {
        ValidationError::RejectedCombination { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::REJECTED_COMBINATION,
            "Solve species cannot control the target element",
            hint,
        ),
        ValidationError::UnknownSpecies { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UNKNOWN_SPECIES,
            "Solve species is not whitelisted",
            hint,
        ),
        ValidationError::UnresolvedPlaceholders { .. } | ValidationError::InvalidField { .. } => {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_REQUEST,
                "Invalid calculation request",
                hint,
            )
        }
    }
}

fn submit_to_api(err: SubmitError) -> ApiError {
    match err {
        SubmitError::Validation(err) => validation_to_api(err),
        SubmitError::QueueClosed => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::QUEUE_CLOSED,
            "Job queue is not accepting work",
            None,
        ),
    }
}

fn presets_to_api(err: PresetError) -> ApiError {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    ApiError::new(
        status,
        codes::PRESETS,
        "Failed to read presets",
        Some(err.to_string()),
    )
    .with_report(ErrorReport::from_error(
        "infra::http::api::presets",
        status,
        &err,
    ))
}

fn archive_to_api(err: ArchiveError) -> ApiError {
    match err {
        ArchiveError::OutputMissing { .. } => ApiError::not_found("Job output directory not found"),
        ArchiveError::NoResults { .. } => ApiError::not_found("Result files not found"),
        ArchiveError::Io { .. } | ArchiveError::Zip(_) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            ApiError::new(
                status,
                codes::ARCHIVE,
                "Failed to package result files",
                Some(err.to_string()),
            )
            .with_report(ErrorReport::from_error(
                "infra::http::api::jobs",
                status,
                &err,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request_codes() {
        let rejected = submit_to_api(SubmitError::Validation(
            ValidationError::RejectedCombination {
                message: "blocked".to_string(),
            },
        ));
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(rejected.code(), codes::REJECTED_COMBINATION);

        let unknown = validation_to_api(ValidationError::UnknownSpecies {
            species: "Xx".to_string(),
            valid: "Ca".to_string(),
        });
        assert_eq!(unknown.code(), codes::UNKNOWN_SPECIES);

        let invalid = validation_to_api(ValidationError::invalid_field("Fe_g", "must be > 0"));
        assert_eq!(invalid.code(), codes::INVALID_REQUEST);
    }

    #[test]
    fn missing_outputs_are_not_found() {
        let err = archive_to_api(ArchiveError::NoResults {
            path: "out".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[test]
    fn closed_queue_is_unavailable() {
        let err = submit_to_api(SubmitError::QueueClosed);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
