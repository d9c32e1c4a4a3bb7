//! Per-topic difficulty tier state machine.
//!
//! The tier moves at most one step per attempt. Rules are evaluated in
//! order and the first match wins:
//!
//! 1. fewer than `min_attempts` attempts: stay
//! 2. evaluator recommends `next_difficulty` with accuracy >= 75: up
//! 3. evaluator recommends `revision`: down
//! 4. accuracy >= 80 over at least 10 attempts: up
//! 5. accuracy < 50: down
//! 6. otherwise stay

use super::config::ProgressPolicy;
use super::types::{DifficultyTier, RecommendedAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMove {
    Up,
    Down,
    Stay,
}

impl TierMove {
    pub fn apply(self, tier: DifficultyTier) -> DifficultyTier {
        match self {
            Self::Up => tier.harder(),
            Self::Down => tier.easier(),
            Self::Stay => tier,
        }
    }
}

pub fn decide_move(
    accuracy: f64,
    attempts: u32,
    recommended_action: Option<RecommendedAction>,
    policy: &ProgressPolicy,
) -> TierMove {
    if attempts < policy.min_attempts {
        return TierMove::Stay;
    }

    match recommended_action {
        Some(RecommendedAction::NextDifficulty) if accuracy >= policy.recommend_promote_accuracy => {
            return TierMove::Up;
        }
        Some(RecommendedAction::Revision) => return TierMove::Down,
        _ => {}
    }

    if accuracy >= policy.auto_promote_accuracy && attempts >= policy.auto_promote_min_attempts {
        TierMove::Up
    } else if accuracy < policy.demote_accuracy {
        TierMove::Down
    } else {
        TierMove::Stay
    }
}

pub fn adjust(
    current: DifficultyTier,
    accuracy: f64,
    attempts: u32,
    recommended_action: Option<RecommendedAction>,
    policy: &ProgressPolicy,
) -> DifficultyTier {
    decide_move(accuracy, attempts, recommended_action, policy).apply(current)
}
