//! Read-only views of the species whitelist and the combination matrix.

use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::domain::combination;
use crate::infra::http::api::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CombinationQuery {
    pub solve_species: String,
    pub target_elem: String,
}

pub async fn validate_combination(
    query: Result<Query<CombinationQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::bad_request(
            "solve_species and target_elem are required",
            Some(rejection.body_text()),
        )
    })?;
    Ok(Json(combination::validate_combination(
        &query.solve_species,
        &query.target_elem,
    )))
}

pub async fn whitelist() -> impl IntoResponse {
    Json(combination::whitelist())
}

pub async fn calc_options() -> impl IntoResponse {
    Json(combination::calc_options())
}
