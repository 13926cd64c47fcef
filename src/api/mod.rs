//! API layer - routes and handlers

pub mod error;
pub mod handlers;

use crate::state::AppState;
use axum::{
    Router,
    response::{IntoResponse, Json},
    routing::{any, get},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Any method triggers a generation
        .route("/generate", any(handlers::generate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "full-autorest"
    }))
}
