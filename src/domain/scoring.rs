//! Pure scoring and ranking over per-participant activity totals.
//!
//! The store aggregates raw events into one [`ActivityTotals`] per
//! participant; everything from score computation to rank assignment happens
//! here so it can be tested without a database.

use super::RankedEntry;
use super::UserId;

/// Aggregated activity for one participant within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTotals {
    /// Participant id.
    pub user_id: UserId,
    /// Display name captured at join time.
    pub username: String,
    /// Sum of event points in the round.
    pub points: i64,
    /// Distinct calendar days with at least one event in the round.
    pub active_days: i64,
}

/// Computes `points + active_days * bonus`.
#[must_use]
pub const fn total_score(points: i64, active_days: i64, day_bonus: i64) -> i64 {
    points + active_days * day_bonus
}

/// Scores and ranks activity totals into a descending leaderboard.
///
/// Ordering is by total score descending, ties broken by participant id so
/// the output is deterministic. Ranks use standard competition ranking:
/// tied scores share a rank value and the next distinct score is ranked
/// `group_start + group_size` (1, 1, 3, 4, …).
#[must_use]
pub fn rank_entries(mut totals: Vec<ActivityTotals>, day_bonus: i64) -> Vec<RankedEntry> {
    totals.sort_by(|a, b| {
        let score_a = total_score(a.points, a.active_days, day_bonus);
        let score_b = total_score(b.points, b.active_days, day_bonus);
        score_b.cmp(&score_a).then(a.user_id.cmp(&b.user_id))
    });

    let mut entries = Vec::with_capacity(totals.len());
    let mut current_rank = 0u32;
    let mut previous_score = None;

    for (position, t) in totals.into_iter().enumerate() {
        let score = total_score(t.points, t.active_days, day_bonus);
        if previous_score != Some(score) {
            current_rank = position as u32 + 1;
            previous_score = Some(score);
        }
        entries.push(RankedEntry {
            rank: current_rank,
            user_id: t.user_id,
            username: t.username,
            total_score: score,
            active_days: t.active_days,
        });
    }

    entries
}
