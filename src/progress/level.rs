//! XP to level curve: `level = max(1, floor(sqrt(xp / 100)))`.

const XP_PER_LEVEL_UNIT: u64 = 100;

/// Ceiling for accumulated XP totals; stores keep XP in signed 64-bit columns.
pub const MAX_XP: u64 = i64::MAX as u64;

pub fn level_for(xp: u64) -> u32 {
    let level = integer_sqrt(xp / XP_PER_LEVEL_UNIT);
    u32::try_from(level).unwrap_or(u32::MAX).max(1)
}

/// Cumulative XP at which `level` is first reached.
pub fn xp_for_level(level: u32) -> u64 {
    let level = u64::from(level);
    level.saturating_mul(level).saturating_mul(XP_PER_LEVEL_UNIT)
}

// floor(sqrt(n)) without float rounding drift on large inputs
fn integer_sqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut root = (n as f64).sqrt() as u64;
    while root.saturating_mul(root) > n {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= n {
        root += 1;
    }
    root
}
