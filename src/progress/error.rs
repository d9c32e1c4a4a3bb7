use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("account already exists: {0}")]
    AccountExists(String),
    #[error("submission already recorded: {0}")]
    DuplicateSubmission(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store failure for user {user_id}{}: {source}", question_suffix(.question_id))]
    Store {
        user_id: String,
        question_id: Option<String>,
        #[source]
        source: StoreError,
    },
}

impl ProgressError {
    /// Only transient store failures are worth retrying, and only with a
    /// submission id so the attempt log cannot double-count.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_transient())
    }

    pub(crate) fn store(user_id: &str, question_id: Option<&str>, source: StoreError) -> Self {
        Self::Store {
            user_id: user_id.to_string(),
            question_id: question_id.map(str::to_string),
            source,
        }
    }
}

fn question_suffix(question_id: &Option<String>) -> String {
    question_id
        .as_deref()
        .map(|q| format!(" (question {q})"))
        .unwrap_or_default()
}
