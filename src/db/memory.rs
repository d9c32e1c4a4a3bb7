use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ProgressStore, StoreError};
use crate::progress::types::{AttemptRecord, TopicProgress, UserAccount};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, UserAccount>,
    topic_progress: HashMap<(String, String), TopicProgress>,
    attempts: Vec<AttemptRecord>,
}

/// Process-local store. Used by tests and when no database path is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_count(&self) -> usize {
        self.tables.read().attempts.len()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.tables.read().accounts.get(user_id).cloned())
    }

    async fn insert_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate(format!("account {}", account.id)));
        }
        tables.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        match tables.accounts.get_mut(&account.id) {
            Some(slot) => {
                *slot = account.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("account {}", account.id))),
        }
    }

    async fn get_topic_progress(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicProgress>, StoreError> {
        let tables = self.tables.read();
        let key = (user_id.to_string(), topic_id.to_string());
        Ok(tables.topic_progress.get(&key).map(|row| {
            let mut row = row.clone();
            row.accuracy = row.computed_accuracy();
            row
        }))
    }

    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StoreError> {
        let key = (progress.user_id.clone(), progress.topic_id.clone());
        self.tables.write().topic_progress.insert(key, progress.clone());
        Ok(())
    }

    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if let Some(ref submission_id) = attempt.submission_id {
            let seen = tables.attempts.iter().any(|a| {
                a.user_id == attempt.user_id && a.submission_id.as_ref() == Some(submission_id)
            });
            if seen {
                return Err(StoreError::Duplicate(format!("submission {submission_id}")));
            }
        }
        tables.attempts.push(attempt.clone());
        Ok(())
    }

    async fn has_submission(&self, user_id: &str, submission_id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().attempts.iter().any(|a| {
            a.user_id == user_id && a.submission_id.as_deref() == Some(submission_id)
        }))
    }

    async fn list_topic_progress(&self, user_id: &str) -> Result<Vec<TopicProgress>, StoreError> {
        let tables = self.tables.read();
        let mut rows: Vec<TopicProgress> = tables
            .topic_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.topic_id.cmp(&b.topic_id));
        Ok(rows)
    }

    async fn recent_attempts(
        &self,
        user_id: &str,
        topic_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        let tables = self.tables.read();
        // log order breaks timestamp ties so later appends come first
        let mut rows: Vec<(usize, &AttemptRecord)> = tables
            .attempts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.user_id == user_id)
            .filter(|(_, a)| topic_id.map_or(true, |t| a.topic_id == t))
            .collect();
        rows.sort_by(|(ia, a), (ib, b)| b.attempted_at.cmp(&a.attempted_at).then(ib.cmp(ia)));

        Ok(rows
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, a)| a.clone())
            .collect())
    }

    async fn top_accounts(&self, limit: usize) -> Result<Vec<UserAccount>, StoreError> {
        let tables = self.tables.read();
        let mut accounts: Vec<UserAccount> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.id.cmp(&b.id)));
        accounts.truncate(limit);
        Ok(accounts)
    }
}
