//! Infrastructure adapters and runtime bootstrap.

pub mod archive;
pub mod error;
pub mod http;
pub mod presets;
pub mod telemetry;
