//! Read-side summaries over accounts, topic progress and the attempt log.

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::ProgressError;
use super::types::{AttemptRecord, TopicProgress, UserAccount};
use crate::db::ProgressStore;

pub const OVERVIEW_RECENT_ATTEMPTS: usize = 10;
pub const STATS_RECENT_ACTIVITY: usize = 7;
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub profile: UserAccount,
    pub topic_progress: Vec<TopicProgress>,
    pub recent_attempts: Vec<AttemptRecord>,
    pub total_questions: u64,
    pub overall_accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub progress: Option<TopicProgress>,
    pub attempts: Vec<AttemptRecord>,
    pub total_attempts: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub level: u32,
    pub xp: u64,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_attempts: usize,
    pub correct_attempts: usize,
    pub accuracy: f64,
    pub total_xp_earned: u64,
    pub mistake_breakdown: BTreeMap<String, usize>,
    pub recent_activity: Vec<AttemptRecord>,
}

pub async fn user_overview(store: &dyn ProgressStore, user_id: &str) -> Result<UserOverview, ProgressError> {
    let profile = store
        .get_account(user_id)
        .await
        .map_err(|e| ProgressError::store(user_id, None, e))?
        .ok_or_else(|| ProgressError::UserNotFound(user_id.to_string()))?;

    let topic_progress = store
        .list_topic_progress(user_id)
        .await
        .map_err(|e| ProgressError::store(user_id, None, e))?;
    let recent_attempts = store
        .recent_attempts(user_id, None, Some(OVERVIEW_RECENT_ATTEMPTS))
        .await
        .map_err(|e| ProgressError::store(user_id, None, e))?;

    let total_questions = topic_progress
        .iter()
        .map(|p| u64::from(p.questions_attempted))
        .sum();
    let overall_accuracy = mean_accuracy(&topic_progress);

    Ok(UserOverview {
        profile,
        topic_progress,
        recent_attempts,
        total_questions,
        overall_accuracy,
    })
}

pub async fn topic_detail(
    store: &dyn ProgressStore,
    user_id: &str,
    topic_id: &str,
) -> Result<TopicDetail, ProgressError> {
    let progress = store
        .get_topic_progress(user_id, topic_id)
        .await
        .map_err(|e| ProgressError::store(user_id, None, e))?;

    let attempts = match progress {
        Some(_) => store
            .recent_attempts(user_id, Some(topic_id), None)
            .await
            .map_err(|e| ProgressError::store(user_id, None, e))?,
        None => Vec::new(),
    };

    Ok(TopicDetail {
        progress,
        total_attempts: attempts.len(),
        attempts,
    })
}

pub async fn leaderboard(store: &dyn ProgressStore, limit: usize) -> Result<Vec<LeaderboardEntry>, ProgressError> {
    let accounts = store
        .top_accounts(limit)
        .await
        .map_err(|e| ProgressError::store("*", None, e))?;

    Ok(accounts
        .into_iter()
        .enumerate()
        .map(|(idx, account)| LeaderboardEntry {
            rank: idx + 1,
            user_id: account.id,
            display_name: account.display_name,
            level: account.level,
            xp: account.xp,
            streak: account.streak,
        })
        .collect())
}

pub async fn user_stats(store: &dyn ProgressStore, user_id: &str) -> Result<UserStats, ProgressError> {
    let attempts = store
        .recent_attempts(user_id, None, None)
        .await
        .map_err(|e| ProgressError::store(user_id, None, e))?;
    Ok(summarize_attempts(attempts))
}

/// Aggregates an attempt log that is ordered most recent first.
pub fn summarize_attempts(attempts: Vec<AttemptRecord>) -> UserStats {
    let total_attempts = attempts.len();
    let correct_attempts = attempts.iter().filter(|a| a.is_correct).count();
    let total_xp_earned = attempts.iter().map(|a| a.xp_earned).sum();

    let mut mistake_breakdown = BTreeMap::new();
    for mistake in attempts.iter().flat_map(|a| a.mistakes.iter()) {
        *mistake_breakdown
            .entry(mistake.mistake_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    let accuracy = if total_attempts == 0 {
        0.0
    } else {
        correct_attempts as f64 / total_attempts as f64 * 100.0
    };

    let mut recent_activity = attempts;
    recent_activity.truncate(STATS_RECENT_ACTIVITY);

    UserStats {
        total_attempts,
        correct_attempts,
        accuracy,
        total_xp_earned,
        mistake_breakdown,
        recent_activity,
    }
}

fn mean_accuracy(progress: &[TopicProgress]) -> f64 {
    if progress.is_empty() {
        return 0.0;
    }
    progress.iter().map(|p| p.accuracy).sum::<f64>() / progress.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::types::{Mistake, MistakeType};
    use chrono::{Duration, TimeZone, Utc};

    fn attempt(idx: i64, is_correct: bool, mistakes: Vec<MistakeType>) -> AttemptRecord {
        AttemptRecord {
            id: format!("a{idx}"),
            submission_id: None,
            user_id: "u1".to_string(),
            question_id: format!("q{idx}"),
            topic_id: "loops".to_string(),
            is_correct,
            xp_earned: if is_correct { 20 } else { 0 },
            time_taken: 15,
            mistakes: mistakes
                .into_iter()
                .map(|mistake_type| Mistake {
                    mistake_type,
                    description: "off by one".to_string(),
                    concept_gap: "loop bounds".to_string(),
                    suggestion: "trace the last iteration".to_string(),
                })
                .collect(),
            recommended_action: None,
            attempted_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() - Duration::minutes(idx),
        }
    }

    #[test]
    fn summarize_counts_mistakes_by_type() {
        let attempts = (0..10)
            .map(|i| match i % 3 {
                0 => attempt(i, true, vec![]),
                1 => attempt(i, false, vec![MistakeType::Minor, MistakeType::Conceptual]),
                _ => attempt(i, false, vec![MistakeType::Minor]),
            })
            .collect();

        let stats = summarize_attempts(attempts);
        assert_eq!(stats.total_attempts, 10);
        assert_eq!(stats.correct_attempts, 4);
        assert!((stats.accuracy - 40.0).abs() < 1e-9);
        assert_eq!(stats.total_xp_earned, 80);
        assert_eq!(stats.mistake_breakdown.get("minor"), Some(&6));
        assert_eq!(stats.mistake_breakdown.get("conceptual"), Some(&3));
        assert_eq!(stats.mistake_breakdown.get("major"), None);
        assert_eq!(stats.recent_activity.len(), STATS_RECENT_ACTIVITY);
        assert_eq!(stats.recent_activity[0].id, "a0");
    }

    #[test]
    fn summarize_empty_log() {
        let stats = summarize_attempts(Vec::new());
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.accuracy, 0.0);
        assert!(stats.recent_activity.is_empty());
    }
}
