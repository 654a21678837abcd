//! HTTP surface for Marquee.
//!
//! Exposes the list enrichment run as a server-sent event stream and the
//! single-title lookup as a plain JSON endpoint. The binary in `main.rs`
//! loads configuration, wires the core services through
//! [`infra::startup`] and serves [`create_app`].

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::{AppState, Enrichment};
pub use infra::errors::{AppError, AppResult};

use axum::{Router, http::Method};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_app(state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .merge(routes::create_api_router())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
