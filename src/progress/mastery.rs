use super::types::DifficultyTier;

const ACCURACY_WEIGHT: f64 = 40.0;
const VOLUME_WEIGHT: f64 = 30.0;
const MAX_MASTERY: u32 = 100;

/// Points contributed by the current tier.
pub fn tier_points(tier: DifficultyTier) -> f64 {
    match tier {
        DifficultyTier::Beginner => 10.0,
        DifficultyTier::Intermediate => 20.0,
        DifficultyTier::Advanced => 25.0,
        DifficultyTier::Expert => 30.0,
    }
}

/// Mastery score in `[0, 100]`: 40 from accuracy, 30 from volume (saturating
/// at `volume_cap` attempts) and up to 30 from the tier.
pub fn mastery(accuracy: f64, attempts: u32, tier: DifficultyTier, volume_cap: u32) -> u32 {
    let accuracy = if accuracy.is_finite() { accuracy.clamp(0.0, 100.0) } else { 0.0 };
    let cap = f64::from(volume_cap.max(1));

    let accuracy_component = accuracy / 100.0 * ACCURACY_WEIGHT;
    let volume_component = (f64::from(attempts) / cap).min(1.0) * VOLUME_WEIGHT;
    let total = accuracy_component + volume_component + tier_points(tier);

    (total.floor() as u32).min(MAX_MASTERY)
}
