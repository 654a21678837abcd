use axum::{Json, extract::State};
use serde::Deserialize;

use marquee_core::pipeline::LookupResult;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct ResolveTitleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
}

pub async fn resolve_title_handler(
    State(state): State<AppState>,
    Json(request): Json<ResolveTitleRequest>,
) -> AppResult<Json<LookupResult>> {
    if request.title.trim().is_empty() {
        return Err(AppError::bad_request("Movie title is required"));
    }

    let result = state
        .enrichment()?
        .lookup
        .lookup(&request.title, request.year)
        .await?;
    Ok(Json(result))
}
