pub mod memory;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::progress::types::{AttemptRecord, TopicProgress, UserAccount};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("sql error: {0}")]
    Sql(sqlx::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::Io(ref io) => Self::Unavailable(io.to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            // SQLITE_BUSY, SQLITE_LOCKED and their extended codes
            sqlx::Error::Database(ref db)
                if matches!(db.code().as_deref(), Some("5" | "6" | "261" | "262" | "517" | "773")) =>
            {
                Self::Unavailable(db.message().to_string())
            }
            sqlx::Error::RowNotFound => Self::NotFound("row".to_string()),
            other => Self::Sql(other),
        }
    }
}

/// Point reads and writes the progress engine needs from storage, plus the
/// recency-ordered scans used by reporting.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Fails with `Duplicate` when the id is taken.
    async fn insert_account(&self, account: &UserAccount) -> Result<(), StoreError>;

    /// Fails with `NotFound` when the account does not exist.
    async fn update_account(&self, account: &UserAccount) -> Result<(), StoreError>;

    async fn get_topic_progress(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicProgress>, StoreError>;

    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StoreError>;

    /// Fails with `Duplicate` when `submission_id` was already logged.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError>;

    async fn has_submission(&self, user_id: &str, submission_id: &str) -> Result<bool, StoreError>;

    async fn list_topic_progress(&self, user_id: &str) -> Result<Vec<TopicProgress>, StoreError>;

    /// Attempts for a user, most recent first, optionally narrowed to one topic.
    async fn recent_attempts(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AttemptRecord>, StoreError>;

    /// Accounts ordered by XP, highest first.
    async fn top_accounts(&self, limit: usize) -> Result<Vec<UserAccount>, StoreError>;
}
