pub mod error;
pub mod handlers;
pub mod state;

pub use state::{ApiState, ConfigInfo};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/calculate", post(handlers::calculate))
        .route("/api/jobs", get(handlers::list_jobs))
        .route("/api/jobs/{id}", get(handlers::get_job))
        .route("/api/jobs/{id}/download", get(handlers::download_results))
        .route(
            "/api/validate-combination",
            get(handlers::validate_combination),
        )
        .route("/api/whitelist", get(handlers::whitelist))
        .route("/api/calc-options", get(handlers::calc_options))
        .route("/api/presets", get(handlers::list_presets))
        .route("/api/presets/{name}", get(handlers::get_preset))
        .route("/api/config/info", get(handlers::config_info))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
