//! Wire types for the ladle additive-estimate API.
//!
//! Field names follow the JSON contract consumed by existing front ends
//! (`Fe_g`, `T_C`, `alpha_g`, ...), while the Rust side uses snake_case.

mod job;
mod request;
mod result;

pub use job::{CalcType, CombinationVerdict, JobListItem, JobResponse, JobStatus, VerdictLevel};
pub use request::{Conditions, JobRequest, MassUnit, SlagInput, SteelInput, Target};
pub use result::{CalculationResult, SlagResult, SteelResult};
