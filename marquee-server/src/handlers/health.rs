use axum::{Json, extract::State};
use serde::Serialize;

use crate::infra::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: &'static str,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.cache_backend(),
    })
}
