use thiserror::Error;

use super::types::JobStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("illegal job transition from {from} to {to}")]
    Transition { from: JobStatus, to: JobStatus },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn transition(from: JobStatus, to: JobStatus) -> Self {
        Self::Transition { from, to }
    }
}

/// Rejections raised before a job exists or before the solver sees any input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{message}")]
    RejectedCombination { message: String },
    #[error("solve species `{species}` is not whitelisted; valid species: {valid}")]
    UnknownSpecies { species: String, valid: String },
    #[error("template has unresolved placeholders: {}", names.join(", "))]
    UnresolvedPlaceholders { names: Vec<String> },
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
