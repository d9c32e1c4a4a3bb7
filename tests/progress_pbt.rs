//! Property-based tests for the pure progress rules.
//!
//! - level is at least 1 and never decreases as XP grows
//! - mastery stays within [0, 100]
//! - the difficulty tier moves by at most one step and stays put without a signal
//! - accuracy always matches the counters after any attempt sequence

use proptest::prelude::*;

use progress_engine::progress::config::ProgressPolicy;
use progress_engine::progress::difficulty::adjust;
use progress_engine::progress::level::level_for;
use progress_engine::progress::mastery::mastery;
use progress_engine::progress::streak::next_streak;
use progress_engine::progress::{DifficultyTier, RecommendedAction};

fn arb_tier() -> impl Strategy<Value = DifficultyTier> {
    prop_oneof![
        Just(DifficultyTier::Beginner),
        Just(DifficultyTier::Intermediate),
        Just(DifficultyTier::Advanced),
        Just(DifficultyTier::Expert),
    ]
}

fn arb_action() -> impl Strategy<Value = Option<RecommendedAction>> {
    prop_oneof![
        Just(None),
        Just(Some(RecommendedAction::Revision)),
        Just(Some(RecommendedAction::DetailedExplanation)),
        Just(Some(RecommendedAction::MorePractice)),
        Just(Some(RecommendedAction::NextDifficulty)),
    ]
}

fn tier_index(tier: DifficultyTier) -> i32 {
    DifficultyTier::ALL.iter().position(|t| *t == tier).unwrap() as i32
}

proptest! {
    #[test]
    fn prop_level_at_least_one_and_monotonic(xp in 0u64..=10_000_000_000u64, extra in 0u64..=1_000_000u64) {
        let low = level_for(xp);
        let high = level_for(xp + extra);
        prop_assert!(low >= 1);
        prop_assert!(high >= low);
    }

    #[test]
    fn prop_mastery_in_range(accuracy in 0.0f64..=100.0, attempts in 0u32..=10_000, tier in arb_tier()) {
        let score = mastery(accuracy, attempts, tier, 50);
        prop_assert!(score <= 100);
        prop_assert!(score >= 10);
    }

    #[test]
    fn prop_tier_moves_at_most_one_step(
        tier in arb_tier(),
        accuracy in 0.0f64..=100.0,
        attempts in 0u32..=200,
        action in arb_action(),
    ) {
        let next = adjust(tier, accuracy, attempts, action, &ProgressPolicy::default());
        prop_assert!((tier_index(next) - tier_index(tier)).abs() <= 1);
        if attempts < 5 {
            prop_assert_eq!(next, tier);
        }
    }

    #[test]
    fn prop_no_signal_band_is_stable(tier in arb_tier(), accuracy in 50.0f64..80.0, attempts in 5u32..=500) {
        let policy = ProgressPolicy::default();
        let once = adjust(tier, accuracy, attempts, None, &policy);
        prop_assert_eq!(once, tier);
        prop_assert_eq!(adjust(once, accuracy, attempts, None, &policy), tier);
    }

    #[test]
    fn prop_streak_is_positive(
        last_offset in proptest::option::of(-5i64..=30),
        current in 0u32..=365,
    ) {
        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let last = last_offset.map(|days| today - chrono::Duration::days(days));
        let next = next_streak(last, current, today);
        prop_assert!(next >= 1);
        prop_assert!(next <= current.saturating_add(1).max(1));
    }

    #[test]
    fn prop_accuracy_tracks_counters(results in prop::collection::vec(any::<bool>(), 1..80)) {
        let now = chrono::Utc::now();
        let mut progress = progress_engine::progress::TopicProgress::new("u", "t", now);
        for correct in &results {
            progress.questions_attempted += 1;
            if *correct {
                progress.questions_correct += 1;
            }
            progress.accuracy = progress.computed_accuracy();
            prop_assert!(progress.questions_correct <= progress.questions_attempted);
            prop_assert!((0.0..=100.0).contains(&progress.accuracy));
        }
        let correct = results.iter().filter(|c| **c).count() as f64;
        let expected = correct / results.len() as f64 * 100.0;
        prop_assert!((progress.accuracy - expected).abs() < 1e-9);
    }
}
