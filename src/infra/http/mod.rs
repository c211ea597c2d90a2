//! HTTP surface over the job manager and the static catalogs.

pub mod api;
mod middleware;

pub use api::{ApiState, ConfigInfo, build_router};
pub use middleware::RequestContext;
