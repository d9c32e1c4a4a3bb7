use serde::{Deserialize, Serialize};

/// Numeric thresholds behind difficulty adjustment and mastery scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPolicy {
    /// Attempts required before the tier may move at all.
    pub min_attempts: u32,
    /// Accuracy needed to honor a `next_difficulty` recommendation.
    pub recommend_promote_accuracy: f64,
    pub auto_promote_accuracy: f64,
    pub auto_promote_min_attempts: u32,
    /// Accuracy strictly below this demotes.
    pub demote_accuracy: f64,
    /// Attempt count at which the volume component saturates.
    pub volume_cap: u32,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            min_attempts: 5,
            recommend_promote_accuracy: 75.0,
            auto_promote_accuracy: 80.0,
            auto_promote_min_attempts: 10,
            demote_accuracy: 50.0,
            volume_cap: 50,
        }
    }
}

impl ProgressPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_attempts: env_u32("PROGRESS_MIN_ATTEMPTS", defaults.min_attempts),
            recommend_promote_accuracy: env_percent(
                "PROGRESS_RECOMMEND_PROMOTE_ACCURACY",
                defaults.recommend_promote_accuracy,
            ),
            auto_promote_accuracy: env_percent(
                "PROGRESS_AUTO_PROMOTE_ACCURACY",
                defaults.auto_promote_accuracy,
            ),
            auto_promote_min_attempts: env_u32(
                "PROGRESS_AUTO_PROMOTE_MIN_ATTEMPTS",
                defaults.auto_promote_min_attempts,
            ),
            demote_accuracy: env_percent("PROGRESS_DEMOTE_ACCURACY", defaults.demote_accuracy),
            volume_cap: Some(env_u32("PROGRESS_VOLUME_CAP", defaults.volume_cap))
                .filter(|cap| *cap > 0)
                .unwrap_or(defaults.volume_cap),
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_percent(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| (0.0..=100.0).contains(value))
        .unwrap_or(default)
}
