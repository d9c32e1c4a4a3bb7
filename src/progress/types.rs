use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Ordered question difficulty for one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 4] = [
        Self::Beginner,
        Self::Intermediate,
        Self::Advanced,
        Self::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    /// One tier up, clamped at `Expert`.
    pub fn harder(&self) -> Self {
        match self {
            Self::Beginner => Self::Intermediate,
            Self::Intermediate => Self::Advanced,
            _ => Self::Expert,
        }
    }

    /// One tier down, clamped at `Beginner`.
    pub fn easier(&self) -> Self {
        match self {
            Self::Expert => Self::Advanced,
            Self::Advanced => Self::Intermediate,
            _ => Self::Beginner,
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }

    /// Unknown stored values fall back to `Beginner`.
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_else(|| {
            tracing::warn!(value = s, "unknown difficulty tier, defaulting to beginner");
            Self::Beginner
        })
    }
}

/// Next step suggested by the answer evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Revision,
    DetailedExplanation,
    MorePractice,
    NextDifficulty,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revision => "revision",
            Self::DetailedExplanation => "detailed_explanation",
            Self::MorePractice => "more_practice",
            Self::NextDifficulty => "next_difficulty",
        }
    }

    /// `None` for values outside the known set; callers treat that as "no signal".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "revision" => Some(Self::Revision),
            "detailed_explanation" => Some(Self::DetailedExplanation),
            "more_practice" => Some(Self::MorePractice),
            "next_difficulty" => Some(Self::NextDifficulty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeType {
    Minor,
    Major,
    Conceptual,
}

impl MistakeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Conceptual => "conceptual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mistake {
    pub mistake_type: MistakeType,
    pub description: String,
    pub concept_gap: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub display_name: String,
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            xp: 0,
            level: 1,
            streak: 0,
            last_activity_date: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub user_id: String,
    pub topic_id: String,
    pub current_difficulty: DifficultyTier,
    pub questions_attempted: u32,
    pub questions_correct: u32,
    pub accuracy: f64,
    pub total_xp_earned: u64,
    pub mastery_level: u32,
    pub last_activity: DateTime<Utc>,
}

impl TopicProgress {
    /// Fresh row for a user's first attempt on a topic.
    pub fn new(user_id: impl Into<String>, topic_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            topic_id: topic_id.into(),
            current_difficulty: DifficultyTier::Beginner,
            questions_attempted: 0,
            questions_correct: 0,
            accuracy: 0.0,
            total_xp_earned: 0,
            mastery_level: 0,
            last_activity: now,
        }
    }

    /// Accuracy in percent derived from the counters.
    pub fn computed_accuracy(&self) -> f64 {
        if self.questions_attempted == 0 {
            0.0
        } else {
            f64::from(self.questions_correct) / f64::from(self.questions_attempted) * 100.0
        }
    }
}

/// Append-only log entry for one submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub submission_id: Option<String>,
    pub user_id: String,
    pub question_id: String,
    pub topic_id: String,
    pub is_correct: bool,
    pub xp_earned: u64,
    pub time_taken: u32,
    pub mistakes: Vec<Mistake>,
    pub recommended_action: Option<RecommendedAction>,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpEvent {
    pub new_level: u32,
    pub xp_required_for_next: u64,
    pub rewards: Vec<String>,
    pub message: String,
}

/// Evaluator output plus the identifiers of the attempt it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub user_id: String,
    pub topic_id: String,
    pub question_id: String,
    pub is_correct: bool,
    pub xp_earned: u64,
    /// Seconds.
    pub time_taken: u32,
    #[serde(default)]
    pub mistakes: Vec<Mistake>,
    #[serde(default)]
    pub recommended_action: Option<RecommendedAction>,
    #[serde(default)]
    pub submission_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub account: UserAccount,
    pub topic_progress: TopicProgress,
    pub level_up: Option<LevelUpEvent>,
}
