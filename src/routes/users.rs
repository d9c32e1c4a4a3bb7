use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest {
    id: String,
    #[serde(default)]
    display_name: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_account))
}

async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .engine()
        .create_account(body.id.trim(), body.display_name.trim())
        .await?;
    Ok((StatusCode::CREATED, ok(account)))
}
