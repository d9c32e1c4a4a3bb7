#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use progress_engine::db::{MemoryStore, ProgressStore, StoreError};
use progress_engine::progress::{
    AttemptOutcome, AttemptRecord, ProgressEngine, ProgressPolicy, RecommendedAction,
    TopicProgress, UserAccount,
};

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn outcome(user_id: &str, topic_id: &str, is_correct: bool, xp: u64) -> AttemptOutcome {
    AttemptOutcome {
        user_id: user_id.to_string(),
        topic_id: topic_id.to_string(),
        question_id: format!("{topic_id}-q"),
        is_correct,
        xp_earned: xp,
        time_taken: 42,
        mistakes: Vec::new(),
        recommended_action: None,
        submission_id: None,
    }
}

pub fn with_action(mut o: AttemptOutcome, action: RecommendedAction) -> AttemptOutcome {
    o.recommended_action = Some(action);
    o
}

pub async fn memory_engine(users: &[&str]) -> (Arc<ProgressEngine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(ProgressEngine::new(store.clone(), ProgressPolicy::default()));
    for user in users {
        engine.create_account(user, user).await.unwrap();
    }
    (engine, store)
}

/// Memory store that fails one named operation with a transient error.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: Mutex<Option<&'static str>>,
}

impl FlakyStore {
    pub fn fail_on(&self, op: &'static str) {
        *self.failing.lock() = Some(op);
    }

    pub fn heal(&self) {
        *self.failing.lock() = None;
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if *self.failing.lock() == Some(op) {
            return Err(StoreError::Unavailable(format!("{op} timed out")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for FlakyStore {
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        self.check("get_account")?;
        self.inner.get_account(user_id).await
    }

    async fn insert_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        self.check("insert_account")?;
        self.inner.insert_account(account).await
    }

    async fn update_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        self.check("update_account")?;
        self.inner.update_account(account).await
    }

    async fn get_topic_progress(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicProgress>, StoreError> {
        self.check("get_topic_progress")?;
        self.inner.get_topic_progress(user_id, topic_id).await
    }

    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StoreError> {
        self.check("upsert_topic_progress")?;
        self.inner.upsert_topic_progress(progress).await
    }

    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        self.check("append_attempt")?;
        self.inner.append_attempt(attempt).await
    }

    async fn has_submission(&self, user_id: &str, submission_id: &str) -> Result<bool, StoreError> {
        self.check("has_submission")?;
        self.inner.has_submission(user_id, submission_id).await
    }

    async fn list_topic_progress(&self, user_id: &str) -> Result<Vec<TopicProgress>, StoreError> {
        self.check("list_topic_progress")?;
        self.inner.list_topic_progress(user_id).await
    }

    async fn recent_attempts(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        self.check("recent_attempts")?;
        self.inner.recent_attempts(user_id, topic_id, limit).await
    }

    async fn top_accounts(&self, limit: usize) -> Result<Vec<UserAccount>, StoreError> {
        self.check("top_accounts")?;
        self.inner.top_accounts(limit).await
    }
}
