use super::level::xp_for_level;
use super::types::LevelUpEvent;

const MILESTONE_INTERVAL: u32 = 5;
const ADVANCED_TOPICS_LEVEL: u32 = 10;
const EXPERT_CHALLENGES_LEVEL: u32 = 20;

pub fn level_rewards(level: u32) -> Vec<String> {
    let mut rewards = Vec::new();
    if level % MILESTONE_INTERVAL == 0 {
        rewards.push(format!("Milestone Badge: Level {level}"));
    }
    if level == ADVANCED_TOPICS_LEVEL {
        rewards.push("Unlocked: Advanced Topics".to_string());
    }
    if level == EXPERT_CHALLENGES_LEVEL {
        rewards.push("Unlocked: Expert Challenges".to_string());
    }
    rewards
}

/// Level-up notice, or `None` when the level did not strictly increase.
pub fn level_up_event(old_level: u32, new_level: u32) -> Option<LevelUpEvent> {
    if new_level <= old_level {
        return None;
    }

    Some(LevelUpEvent {
        new_level,
        xp_required_for_next: xp_for_level(new_level.saturating_add(1)),
        rewards: level_rewards(new_level),
        message: format!("Congratulations! You've reached Level {new_level}!"),
    })
}
