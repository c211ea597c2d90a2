use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

use super::presets_to_api;

pub async fn list_presets(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let names = state.presets.list().await.map_err(presets_to_api)?;
    Ok(Json(names))
}

pub async fn get_preset(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let preset = state
        .presets
        .get(&name)
        .await
        .map_err(presets_to_api)?
        .ok_or_else(|| ApiError::not_found("Preset not found"))?;
    Ok(Json(preset))
}
