//! Cooldown-aware champion rotation.
//!
//! Pure selection over a ranked list: no I/O, no clock. The caller supplies
//! the cooldown set (holders of the champion role in the previous round) and
//! receives the next round's eligible champions in rank order.

use std::collections::HashSet;

use super::{RankedEntry, UserId};

/// Walks `ranked` in rank order, skipping members of `cooldown`, and collects
/// up to `count` entries.
///
/// Relative order of the input is preserved; the result is shorter than
/// `count` when the list is exhausted first.
#[must_use]
pub fn eligible_champions(
    ranked: &[RankedEntry],
    cooldown: &HashSet<UserId>,
    count: usize,
) -> Vec<RankedEntry> {
    ranked
        .iter()
        .filter(|entry| !cooldown.contains(&entry.user_id))
        .take(count)
        .cloned()
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn entry(rank: u32, id: i64) -> RankedEntry {
        RankedEntry {
            rank,
            user_id: UserId::new(id),
            username: format!("user-{id}"),
            total_score: 100 - i64::from(rank),
            active_days: 1,
        }
    }

    #[test]
    fn skips_cooldown_members_in_order() {
        // Ranked [X, Y, Z, W] with X resting -> [Y, Z, W].
        let ranked = vec![entry(1, 10), entry(2, 20), entry(3, 30), entry(4, 40)];
        let cooldown: HashSet<UserId> = [UserId::new(10)].into_iter().collect();

        let champions = eligible_champions(&ranked, &cooldown, 3);
        let ids: Vec<i64> = champions.iter().map(|e| e.user_id.get()).collect();
        assert_eq!(ids, vec![20, 30, 40]);
    }

    #[test]
    fn returns_at_most_count_entries() {
        let ranked: Vec<RankedEntry> = (1..=10).map(|i| entry(i, i64::from(i))).collect();
        let champions = eligible_champions(&ranked, &HashSet::new(), 3);
        assert_eq!(champions.len(), 3);
    }

    #[test]
    fn never_returns_cooldown_members() {
        let ranked: Vec<RankedEntry> = (1..=6).map(|i| entry(i, i64::from(i))).collect();
        let cooldown: HashSet<UserId> = [UserId::new(2), UserId::new(4)].into_iter().collect();

        let champions = eligible_champions(&ranked, &cooldown, 3);
        for c in &champions {
            assert!(!cooldown.contains(&c.user_id));
        }
        let ids: Vec<i64> = champions.iter().map(|e| e.user_id.get()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn short_list_returns_fewer_than_count() {
        let ranked = vec![entry(1, 1), entry(2, 2)];
        let cooldown: HashSet<UserId> = [UserId::new(1)].into_iter().collect();
        let champions = eligible_champions(&ranked, &cooldown, 3);
        assert_eq!(champions.len(), 1);
    }

    #[test]
    fn empty_list_is_empty() {
        assert!(eligible_champions(&[], &HashSet::new(), 3).is_empty());
    }
}
