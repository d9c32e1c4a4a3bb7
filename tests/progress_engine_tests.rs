//! End-to-end scenarios for the progress engine against in-memory stores.

mod common;

use std::sync::Arc;

use common::{at, memory_engine, outcome, with_action, FlakyStore};
use progress_engine::db::ProgressStore;
use progress_engine::progress::{
    DifficultyTier, Mistake, MistakeType, ProgressEngine, ProgressError, ProgressPolicy,
    RecommendedAction, TopicProgress,
};

#[tokio::test]
async fn first_correct_attempt_on_new_topic() {
    let (engine, store) = memory_engine(&["u1"]).await;

    let result = engine
        .record_attempt_at(outcome("u1", "recursion", true, 50), at(2024, 4, 10, 9))
        .await
        .unwrap();

    let progress = &result.topic_progress;
    assert_eq!(progress.questions_attempted, 1);
    assert_eq!(progress.questions_correct, 1);
    assert_eq!(progress.accuracy, 100.0);
    assert_eq!(progress.current_difficulty, DifficultyTier::Beginner);
    assert_eq!(progress.mastery_level, 50);
    assert_eq!(progress.total_xp_earned, 50);

    assert_eq!(result.account.xp, 50);
    assert_eq!(result.account.level, 1);
    assert_eq!(result.account.streak, 1);
    assert_eq!(result.account.last_activity_date, Some(at(2024, 4, 10, 9).date_naive()));
    assert!(result.level_up.is_none());

    assert_eq!(store.attempt_count(), 1);
    let stored = store.get_account("u1").await.unwrap().unwrap();
    assert_eq!(stored, result.account);
}

#[tokio::test]
async fn recommendation_promotes_before_accuracy_rule() {
    let (engine, store) = memory_engine(&["u1"]).await;
    let now = at(2024, 4, 10, 9);

    let mut seeded = TopicProgress::new("u1", "graphs", now);
    seeded.questions_attempted = 9;
    seeded.questions_correct = 8;
    seeded.accuracy = seeded.computed_accuracy();
    store.upsert_topic_progress(&seeded).await.unwrap();

    let attempt = with_action(outcome("u1", "graphs", true, 20), RecommendedAction::NextDifficulty);
    let result = engine.record_attempt_at(attempt, now).await.unwrap();

    assert_eq!(result.topic_progress.questions_attempted, 10);
    assert_eq!(result.topic_progress.questions_correct, 9);
    assert_eq!(result.topic_progress.current_difficulty, DifficultyTier::Intermediate);
    // 36 + 6 + 20
    assert_eq!(result.topic_progress.mastery_level, 62);
}

#[tokio::test]
async fn tier_moves_one_step_per_attempt() {
    let (engine, _) = memory_engine(&["u1"]).await;
    let now = at(2024, 4, 10, 9);

    let mut tiers = Vec::new();
    for _ in 0..12 {
        let result = engine
            .record_attempt_at(outcome("u1", "sorting", true, 10), now)
            .await
            .unwrap();
        tiers.push(result.topic_progress.current_difficulty);
    }

    // auto-promotion starts at the tenth attempt and then fires every attempt
    assert!(tiers[..9].iter().all(|t| *t == DifficultyTier::Beginner));
    assert_eq!(tiers[9], DifficultyTier::Intermediate);
    assert_eq!(tiers[10], DifficultyTier::Advanced);
    assert_eq!(tiers[11], DifficultyTier::Expert);
}

#[tokio::test]
async fn revision_recommendation_demotes() {
    let (engine, store) = memory_engine(&["u1"]).await;
    let now = at(2024, 4, 10, 9);

    let mut seeded = TopicProgress::new("u1", "dp", now);
    seeded.current_difficulty = DifficultyTier::Advanced;
    seeded.questions_attempted = 6;
    seeded.questions_correct = 6;
    store.upsert_topic_progress(&seeded).await.unwrap();

    let attempt = with_action(outcome("u1", "dp", true, 5), RecommendedAction::Revision);
    let result = engine.record_attempt_at(attempt, now).await.unwrap();
    assert_eq!(result.topic_progress.current_difficulty, DifficultyTier::Intermediate);
}

#[tokio::test]
async fn level_up_event_reports_next_threshold() {
    let (engine, _) = memory_engine(&["u1"]).await;
    let now = at(2024, 4, 10, 9);

    let first = engine
        .record_attempt_at(outcome("u1", "maps", true, 350), now)
        .await
        .unwrap();
    assert!(first.level_up.is_none());

    let second = engine
        .record_attempt_at(outcome("u1", "maps", true, 100), now)
        .await
        .unwrap();
    let event = second.level_up.expect("level up expected");
    assert_eq!(event.new_level, 2);
    assert_eq!(event.xp_required_for_next, 900);
    assert!(event.rewards.is_empty());
    assert_eq!(second.account.level, 2);
}

#[tokio::test]
async fn jumping_to_level_ten_grants_unlock() {
    let (engine, _) = memory_engine(&["u1"]).await;

    let result = engine
        .record_attempt_at(outcome("u1", "maps", true, 10_000), at(2024, 4, 10, 9))
        .await
        .unwrap();
    let event = result.level_up.unwrap();
    assert_eq!(event.new_level, 10);
    assert_eq!(event.xp_required_for_next, 12_100);
    assert!(event.rewards.iter().any(|r| r.contains("Milestone")));
    assert!(event.rewards.iter().any(|r| r.contains("Advanced Topics")));
}

#[tokio::test]
async fn streak_follows_calendar_days() {
    let (engine, _) = memory_engine(&["u1"]).await;

    let mut streaks = Vec::new();
    for when in [
        at(2024, 4, 10, 9),
        at(2024, 4, 10, 22),
        at(2024, 4, 11, 7),
        at(2024, 4, 12, 7),
        at(2024, 4, 15, 7),
    ] {
        let result = engine
            .record_attempt_at(outcome("u1", "strings", true, 5), when)
            .await
            .unwrap();
        streaks.push(result.account.streak);
    }

    assert_eq!(streaks, vec![1, 1, 2, 3, 1]);
}

#[tokio::test]
async fn attempt_log_keeps_evaluator_output() {
    let (engine, store) = memory_engine(&["u1"]).await;

    let mut attempt = outcome("u1", "pointers", false, 0);
    attempt.mistakes = vec![Mistake {
        mistake_type: MistakeType::Conceptual,
        description: "dereferenced a moved value".to_string(),
        concept_gap: "ownership".to_string(),
        suggestion: "borrow instead".to_string(),
    }];
    attempt.recommended_action = Some(RecommendedAction::DetailedExplanation);
    attempt.time_taken = 95;

    engine.record_attempt_at(attempt.clone(), at(2024, 4, 10, 9)).await.unwrap();

    let logged = store.recent_attempts("u1", None, None).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].mistakes, attempt.mistakes);
    assert_eq!(logged[0].recommended_action, Some(RecommendedAction::DetailedExplanation));
    assert_eq!(logged[0].time_taken, 95);
    assert_eq!(logged[0].attempted_at, at(2024, 4, 10, 9));
}

#[tokio::test]
async fn unknown_user_is_fatal_and_writes_nothing() {
    let (engine, store) = memory_engine(&[]).await;

    let err = engine
        .record_attempt_at(outcome("ghost", "t", true, 10), at(2024, 4, 10, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::UserNotFound(ref id) if id == "ghost"));
    assert!(store.get_topic_progress("ghost", "t").await.unwrap().is_none());
    assert_eq!(store.attempt_count(), 0);
}

#[tokio::test]
async fn duplicate_submission_is_rejected() {
    let (engine, store) = memory_engine(&["u1"]).await;
    let now = at(2024, 4, 10, 9);

    let mut attempt = outcome("u1", "heaps", true, 30);
    attempt.submission_id = Some("sub-1".to_string());

    engine.record_attempt_at(attempt.clone(), now).await.unwrap();
    let err = engine.record_attempt_at(attempt, now).await.unwrap_err();

    assert!(matches!(err, ProgressError::DuplicateSubmission(ref id) if id == "sub-1"));
    assert_eq!(store.attempt_count(), 1);
    assert_eq!(store.get_account("u1").await.unwrap().unwrap().xp, 30);
}

#[tokio::test]
async fn store_failure_aborts_remaining_steps() {
    let store = Arc::new(FlakyStore::default());
    let engine = ProgressEngine::new(store.clone(), ProgressPolicy::default());
    engine.create_account("u1", "Ada").await.unwrap();

    store.fail_on("upsert_topic_progress");
    let err = engine
        .record_attempt_at(outcome("u1", "tries", true, 40), at(2024, 4, 10, 9))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(err.to_string().contains("u1"));

    // account writes before the failing step stay in place
    let account = store.inner.get_account("u1").await.unwrap().unwrap();
    assert_eq!(account.xp, 40);
    assert_eq!(account.streak, 1);
    assert!(store.inner.get_topic_progress("u1", "tries").await.unwrap().is_none());
    assert_eq!(store.inner.attempt_count(), 0);

    store.heal();
    let retried = engine
        .record_attempt_at(outcome("u1", "tries", true, 40), at(2024, 4, 10, 9))
        .await
        .unwrap();
    assert_eq!(retried.topic_progress.questions_attempted, 1);
}

#[tokio::test]
async fn failure_reading_account_is_retryable() {
    let store = Arc::new(FlakyStore::default());
    let engine = ProgressEngine::new(store.clone(), ProgressPolicy::default());
    engine.create_account("u1", "Ada").await.unwrap();

    store.fail_on("get_account");
    let err = engine
        .record_attempt_at(outcome("u1", "t", true, 40), at(2024, 4, 10, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::Store { .. }));
    assert!(err.is_retryable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_for_one_user_are_not_lost() {
    let (engine, store) = memory_engine(&["u1", "u2"]).await;
    let now = at(2024, 4, 10, 9);

    let mut handles = Vec::new();
    for i in 0..40u64 {
        let engine = Arc::clone(&engine);
        let user = if i % 2 == 0 { "u1" } else { "u2" };
        handles.push(tokio::spawn(async move {
            engine
                .record_attempt_at(outcome(user, "concurrency", i % 4 < 2, 10), now)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for user in ["u1", "u2"] {
        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.xp, 200);
        let progress = store.get_topic_progress(user, "concurrency").await.unwrap().unwrap();
        assert_eq!(progress.questions_attempted, 20);
        assert_eq!(progress.total_xp_earned, 200);
    }
    assert_eq!(store.attempt_count(), 40);
}

#[tokio::test]
async fn derived_fields_match_counters_after_reload() {
    let (engine, store) = memory_engine(&["u1"]).await;
    let now = at(2024, 4, 10, 9);

    for i in 0..7 {
        engine
            .record_attempt_at(outcome("u1", "queues", i % 3 != 0, 10), now)
            .await
            .unwrap();
    }

    let reloaded = store.get_topic_progress("u1", "queues").await.unwrap().unwrap();
    assert_eq!(reloaded.accuracy, reloaded.computed_accuracy());
    let expected = progress_engine::progress::mastery::mastery(
        reloaded.accuracy,
        reloaded.questions_attempted,
        reloaded.current_difficulty,
        50,
    );
    assert_eq!(reloaded.mastery_level, expected);
}

#[tokio::test]
async fn duplicate_account_is_a_conflict() {
    let (engine, _) = memory_engine(&["u1"]).await;
    let err = engine.create_account("u1", "again").await.unwrap_err();
    assert!(matches!(err, ProgressError::AccountExists(_)));
}
