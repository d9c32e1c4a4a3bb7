use chrono::NaiveDate;

/// Consecutive-day streak after activity on `today`.
///
/// Same day keeps the count, the next day extends it, any longer gap (or a
/// last-activity date in the future) restarts at 1.
pub fn next_streak(last_activity_date: Option<NaiveDate>, current_streak: u32, today: NaiveDate) -> u32 {
    let Some(last) = last_activity_date else {
        return 1;
    };

    match (today - last).num_days() {
        0 => current_streak.max(1),
        1 => current_streak.saturating_add(1),
        _ => 1,
    }
}
