use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OwnedMutexGuard;

use super::config::ProgressPolicy;
use super::error::ProgressError;
use super::types::{AttemptOutcome, AttemptRecord, AttemptResult, TopicProgress, UserAccount};
use super::{difficulty, level, mastery, rewards, streak};
use crate::db::{ProgressStore, StoreError};

/// Applies evaluated attempts to a user's account and topic progress.
///
/// Attempts for the same user are applied one at a time; different users
/// proceed concurrently. Each store write is independent, so a failure part
/// way through leaves the earlier writes in place.
pub struct ProgressEngine {
    store: Arc<dyn ProgressStore>,
    policy: ProgressPolicy,
    user_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn ProgressStore>, policy: ProgressPolicy) -> Self {
        Self {
            store,
            policy,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProgressStore> {
        &self.store
    }

    pub fn policy(&self) -> &ProgressPolicy {
        &self.policy
    }

    pub async fn create_account(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<UserAccount, ProgressError> {
        if user_id.trim().is_empty() {
            return Err(ProgressError::Validation("user id is required".to_string()));
        }

        let account = UserAccount::new(user_id, display_name, Utc::now());
        match self.store.insert_account(&account).await {
            Ok(()) => {
                tracing::info!(user_id, "account created");
                Ok(account)
            }
            Err(StoreError::Duplicate(_)) => Err(ProgressError::AccountExists(user_id.to_string())),
            Err(err) => Err(ProgressError::store(user_id, None, err)),
        }
    }

    pub async fn record_attempt(&self, outcome: AttemptOutcome) -> Result<AttemptResult, ProgressError> {
        self.record_attempt_at(outcome, Utc::now()).await
    }

    /// Same as [`record_attempt`](Self::record_attempt) with an explicit clock.
    pub async fn record_attempt_at(
        &self,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<AttemptResult, ProgressError> {
        validate_outcome(&outcome)?;

        let lease = self.lock_user(&outcome.user_id).await;
        let result = self.apply_attempt(&outcome, now).await;
        drop(lease);

        if let Err(ref err) = result {
            tracing::warn!(
                user_id = %outcome.user_id,
                question_id = %outcome.question_id,
                error = %err,
                "attempt not recorded"
            );
        }
        result
    }

    async fn apply_attempt(
        &self,
        outcome: &AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<AttemptResult, ProgressError> {
        let user_id = outcome.user_id.as_str();
        let store_err =
            |source: StoreError| ProgressError::store(user_id, Some(outcome.question_id.as_str()), source);

        if let Some(ref submission_id) = outcome.submission_id {
            if self.store.has_submission(user_id, submission_id).await.map_err(store_err)? {
                return Err(ProgressError::DuplicateSubmission(submission_id.clone()));
            }
        }

        // account: xp and level
        let mut account = self
            .store
            .get_account(user_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ProgressError::UserNotFound(user_id.to_string()))?;

        let old_level = level::level_for(account.xp);
        account.xp = account.xp.saturating_add(outcome.xp_earned).min(level::MAX_XP);
        let new_level = level::level_for(account.xp);
        account.level = new_level;
        self.store.update_account(&account).await.map_err(store_err)?;

        let level_up = rewards::level_up_event(old_level, new_level);
        if let Some(ref event) = level_up {
            tracing::info!(user_id, old_level, new_level = event.new_level, "level up");
        }

        // account: streak
        let today = now.date_naive();
        account.streak = streak::next_streak(account.last_activity_date, account.streak, today);
        account.last_activity_date = Some(today);
        self.store.update_account(&account).await.map_err(store_err)?;

        // topic progress
        let mut progress = self
            .store
            .get_topic_progress(user_id, &outcome.topic_id)
            .await
            .map_err(store_err)?
            .unwrap_or_else(|| TopicProgress::new(user_id, &outcome.topic_id, now));

        self.update_topic(&mut progress, outcome, now);
        self.store.upsert_topic_progress(&progress).await.map_err(store_err)?;

        let attempt = AttemptRecord {
            id: uuid::Uuid::new_v4().to_string(),
            submission_id: outcome.submission_id.clone(),
            user_id: user_id.to_string(),
            question_id: outcome.question_id.clone(),
            topic_id: outcome.topic_id.clone(),
            is_correct: outcome.is_correct,
            xp_earned: outcome.xp_earned,
            time_taken: outcome.time_taken,
            mistakes: outcome.mistakes.clone(),
            recommended_action: outcome.recommended_action,
            attempted_at: now,
        };
        match self.store.append_attempt(&attempt).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                let submission_id = attempt.submission_id.unwrap_or_default();
                return Err(ProgressError::DuplicateSubmission(submission_id));
            }
            Err(err) => return Err(store_err(err)),
        }

        tracing::debug!(
            user_id,
            topic_id = %progress.topic_id,
            xp = account.xp,
            streak = account.streak,
            mastery = progress.mastery_level,
            "attempt recorded"
        );

        Ok(AttemptResult {
            account,
            topic_progress: progress,
            level_up,
        })
    }

    fn update_topic(&self, progress: &mut TopicProgress, outcome: &AttemptOutcome, now: DateTime<Utc>) {
        progress.questions_attempted = progress.questions_attempted.saturating_add(1);
        if outcome.is_correct {
            progress.questions_correct = progress.questions_correct.saturating_add(1);
        }
        progress.accuracy = progress.computed_accuracy();
        progress.total_xp_earned = progress
            .total_xp_earned
            .saturating_add(outcome.xp_earned)
            .min(level::MAX_XP);
        progress.last_activity = now;

        let previous = progress.current_difficulty;
        progress.current_difficulty = difficulty::adjust(
            previous,
            progress.accuracy,
            progress.questions_attempted,
            outcome.recommended_action,
            &self.policy,
        );
        if progress.current_difficulty != previous {
            tracing::info!(
                user_id = %progress.user_id,
                topic_id = %progress.topic_id,
                from = previous.as_str(),
                to = progress.current_difficulty.as_str(),
                "difficulty changed"
            );
        }

        progress.mastery_level = mastery::mastery(
            progress.accuracy,
            progress.questions_attempted,
            progress.current_difficulty,
            self.policy.volume_cap,
        );
    }

    async fn lock_user(&self, user_id: &str) -> UserLease<'_> {
        let lock = {
            let mut locks = self.user_locks.lock();
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        UserLease {
            engine: self,
            user_id: user_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    // drop the entry once no other task holds or waits on it
    fn release_user(&self, user_id: &str) {
        let mut locks = self.user_locks.lock();
        if locks.get(user_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(user_id);
        }
    }
}

/// Holds a user's lock; dropping it releases the lock and prunes the map
/// entry, including when the owning future is cancelled mid-attempt.
struct UserLease<'a> {
    engine: &'a ProgressEngine,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.engine.release_user(&self.user_id);
    }
}

fn validate_outcome(outcome: &AttemptOutcome) -> Result<(), ProgressError> {
    for (field, value) in [
        ("userId", &outcome.user_id),
        ("topicId", &outcome.topic_id),
        ("questionId", &outcome.question_id),
    ] {
        if value.trim().is_empty() {
            return Err(ProgressError::Validation(format!("{field} is required")));
        }
    }
    if outcome.xp_earned > level::MAX_XP {
        return Err(ProgressError::Validation(format!("xpEarned must not exceed {}", level::MAX_XP)));
    }
    if outcome.submission_id.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(ProgressError::Validation("submissionId must not be blank".to_string()));
    }
    Ok(())
}
