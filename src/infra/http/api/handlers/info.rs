use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::infra::http::api::state::ApiState;

pub async fn config_info(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.info.as_ref().clone())
}
