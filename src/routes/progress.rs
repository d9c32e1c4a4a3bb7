use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::progress::report::{self, DEFAULT_LEADERBOARD_LIMIT};
use crate::progress::{AttemptOutcome, Mistake, RecommendedAction};
use crate::response::{ok, AppError};
use crate::state::AppState;

const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordAttemptRequest {
    user_id: String,
    topic_id: String,
    question_id: String,
    is_correct: bool,
    xp_earned: u64,
    #[serde(default)]
    time_taken: u32,
    #[serde(default)]
    mistakes: Vec<Mistake>,
    #[serde(default)]
    recommended_action: Option<String>,
    #[serde(default)]
    submission_id: Option<String>,
}

impl RecordAttemptRequest {
    fn into_outcome(self) -> AttemptOutcome {
        let recommended_action = self.recommended_action.as_deref().and_then(|raw| {
            let parsed = RecommendedAction::parse(raw);
            if parsed.is_none() {
                tracing::warn!(value = raw, "unknown recommended action, treated as no signal");
            }
            parsed
        });

        AttemptOutcome {
            user_id: self.user_id,
            topic_id: self.topic_id,
            question_id: self.question_id,
            is_correct: self.is_correct,
            xp_earned: self.xp_earned,
            time_taken: self.time_taken,
            mistakes: self.mistakes,
            recommended_action,
            submission_id: self.submission_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attempts", post(record_attempt))
        .route("/user/:user_id", get(user_overview))
        .route("/topic/:user_id/:topic_id", get(topic_detail))
        .route("/leaderboard", get(leaderboard))
        .route("/stats/:user_id", get(user_stats))
}

async fn record_attempt(
    State(state): State<AppState>,
    body: Result<Json<RecordAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let result = state.engine().record_attempt(body.into_outcome()).await?;
    Ok(ok(result))
}

async fn user_overview(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(report::user_overview(state.store(), &user_id).await?))
}

async fn topic_detail(
    State(state): State<AppState>,
    Path((user_id, topic_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(report::topic_detail(state.store(), &user_id, &topic_id).await?))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);
    Ok(ok(report::leaderboard(state.store(), limit).await?))
}

async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(report::user_stats(state.store(), &user_id).await?))
}
