//! Shared domain enumerations and wire records.

use std::fmt;

pub use ladle_api_types::{
    CalcType, CalculationResult, CombinationVerdict, Conditions, JobRequest, MassUnit, SlagInput,
    SlagResult, SteelInput, SteelResult, Target, VerdictLevel,
};
pub use ladle_api_types::JobStatus;

/// Opaque job identifier, unique for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
