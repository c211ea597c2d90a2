//! Application services: input rendering, solver invocation, result parsing
//! and the job queue that sequences them.

pub mod error;
pub mod job_manager;
pub(crate) mod lock;
pub mod results;
pub mod solver;
pub mod templates;
