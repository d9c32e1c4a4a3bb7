mod progress;
mod users;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/users", users::router())
        .nest("/api/progress", progress::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn fallback_handler() -> AppError {
    AppError::not_found("route not found")
}
