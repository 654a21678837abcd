use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    handlers::{health::health_handler, lists::stream_list_handler, lookup::resolve_title_handler},
    infra::app_state::AppState,
};

pub const HEALTH: &str = "/health";
pub const LIST_STREAM: &str = "/lists/stream";
pub const RESOLVE_TITLE: &str = "/movies/resolve";

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(HEALTH, get(health_handler))
        .route(LIST_STREAM, post(stream_list_handler))
        .route(RESOLVE_TITLE, post(resolve_title_handler))
}
