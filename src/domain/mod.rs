//! Domain layer types and invariants.

pub mod combination;
pub mod error;
pub mod job;
pub mod request;
pub mod types;
