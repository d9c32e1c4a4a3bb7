pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod level;
pub mod mastery;
pub mod report;
pub mod rewards;
pub mod streak;
pub mod types;

pub use config::ProgressPolicy;
pub use engine::ProgressEngine;
pub use error::ProgressError;
pub use types::{
    AttemptOutcome, AttemptRecord, AttemptResult, DifficultyTier, LevelUpEvent, Mistake,
    MistakeType, RecommendedAction, TopicProgress, UserAccount,
};
