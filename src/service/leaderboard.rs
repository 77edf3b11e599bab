//! Ranked standings with a short-TTL cache.

use std::sync::Arc;

use crate::domain::{
    rank_entries, BoardType, LeaderboardCache, RankedEntry, RoundId, UserId,
};
use crate::error::LeagueError;
use crate::store::LeagueStore;

/// Computes ranked standings per board, serving from the cache while fresh.
///
/// The cache is keyed per (board, limit) request shape and invalidated
/// wholesale by [`ActivityRecorder`](crate::service::ActivityRecorder) and
/// by round close, so entries never outlive the data they rank.
#[derive(Debug)]
pub struct LeaderboardAggregator {
    store: Arc<dyn LeagueStore>,
    cache: Arc<LeaderboardCache>,
    active_day_bonus: i64,
}

impl LeaderboardAggregator {
    /// Creates an aggregator over the store and the shared cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn LeagueStore>,
        cache: Arc<LeaderboardCache>,
        active_day_bonus: i64,
    ) -> Self {
        Self {
            store,
            cache,
            active_day_bonus,
        }
    }

    /// Returns the ranked board for a round, truncated to `limit` rows when
    /// given.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the recompute path.
    pub async fn board(
        &self,
        round_id: RoundId,
        board: BoardType,
        limit: Option<u32>,
    ) -> Result<Vec<RankedEntry>, LeagueError> {
        let key = (board, limit);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let totals = self.store.board_totals(round_id, board).await?;
        let mut ranked = rank_entries(totals, self.active_day_bonus);
        if let Some(limit) = limit {
            ranked.truncate(limit as usize);
        }

        self.cache.put(key, ranked.clone()).await;
        Ok(ranked)
    }

    /// Bonus points per active day used in score computation.
    #[must_use]
    pub const fn active_day_bonus(&self) -> i64 {
        self.active_day_bonus
    }

    /// Competition rank of one participant on a board, or `None` when the
    /// participant is not on it.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the recompute path.
    pub async fn rank_of(
        &self,
        round_id: RoundId,
        board: BoardType,
        user_id: UserId,
    ) -> Result<Option<u32>, LeagueError> {
        let full = self.board(round_id, board, None).await?;
        Ok(full
            .iter()
            .find(|entry| entry.user_id == user_id)
            .map(|entry| entry.rank))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::models::{ActivityEvent, Round, RoundStatus};
    use crate::store::MemoryStore;
    use crate::domain::ChannelId;
    use chrono::{Duration, Utc};

    async fn seed(store: &MemoryStore) -> RoundId {
        let round = Round {
            round_id: RoundId::new(),
            round_number: 1,
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::days(7),
            status: RoundStatus::Active,
        };
        let Ok(()) = store.open_round(&round).await else {
            panic!("open_round failed");
        };

        // A: 5 points on one day; B: 3 points across two days.
        let Ok(()) = store.upsert_member(UserId::new(1), "alice", true, false).await else {
            panic!("upsert failed");
        };
        let Ok(()) = store.upsert_member(UserId::new(2), "bob", true, false).await else {
            panic!("upsert failed");
        };

        let base = Utc::now();
        for i in 0..5 {
            let Ok(()) = store
                .record_event(&ActivityEvent {
                    user_id: UserId::new(1),
                    round_id: round.round_id,
                    channel_id: ChannelId::new(i),
                    points: 1,
                    source_event_id: None,
                    created_at: base,
                })
                .await
            else {
                panic!("record failed");
            };
        }
        for (i, offset) in [(0, 0), (1, 0), (2, 25)] {
            let Ok(()) = store
                .record_event(&ActivityEvent {
                    user_id: UserId::new(2),
                    round_id: round.round_id,
                    channel_id: ChannelId::new(i),
                    points: 1,
                    source_event_id: None,
                    created_at: base + Duration::hours(offset),
                })
                .await
            else {
                panic!("record failed");
            };
        }
        round.round_id
    }

    fn aggregator(store: &Arc<MemoryStore>, cache: &Arc<LeaderboardCache>) -> LeaderboardAggregator {
        LeaderboardAggregator::new(
            Arc::clone(store) as Arc<dyn LeagueStore>,
            Arc::clone(cache),
            5,
        )
    }

    #[tokio::test]
    async fn day_bonus_decides_the_ordering() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        let round_id = seed(&store).await;
        let agg = aggregator(&store, &cache);

        let Ok(board) = agg.board(round_id, BoardType::Spanish, Some(10)).await else {
            panic!("board failed");
        };

        // B: 3 + 2*5 = 13 beats A: 5 + 1*5 = 10.
        let scores: Vec<(i64, u32)> = board.iter().map(|e| (e.user_id.get(), e.rank)).collect();
        assert_eq!(scores, vec![(2, 1), (1, 2)]);
        let Some(first) = board.first() else {
            panic!("missing first");
        };
        assert_eq!(first.total_score, 13);
        assert_eq!(first.active_days, 2);
    }

    #[tokio::test]
    async fn cached_board_survives_store_changes_until_invalidated() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        let round_id = seed(&store).await;
        let agg = aggregator(&store, &cache);

        let Ok(before) = agg.board(round_id, BoardType::Spanish, Some(10)).await else {
            panic!("board failed");
        };

        // A new member is not visible while the cache is warm...
        let Ok(()) = store.upsert_member(UserId::new(3), "carol", true, false).await else {
            panic!("upsert failed");
        };
        let Ok(warm) = agg.board(round_id, BoardType::Spanish, Some(10)).await else {
            panic!("board failed");
        };
        assert_eq!(warm, before);

        // ...and appears after invalidation.
        cache.invalidate_all().await;
        let Ok(fresh) = agg.board(round_id, BoardType::Spanish, Some(10)).await else {
            panic!("board failed");
        };
        assert_eq!(fresh.len(), before.len() + 1);
    }

    #[tokio::test]
    async fn rank_of_uses_the_full_board() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        let round_id = seed(&store).await;
        let agg = aggregator(&store, &cache);

        let Ok(rank) = agg.rank_of(round_id, BoardType::Spanish, UserId::new(1)).await else {
            panic!("rank_of failed");
        };
        assert_eq!(rank, Some(2));

        let Ok(missing) = agg.rank_of(round_id, BoardType::Spanish, UserId::new(42)).await else {
            panic!("rank_of failed");
        };
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn english_board_excludes_spanish_learners() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        let round_id = seed(&store).await;
        let agg = aggregator(&store, &cache);

        let Ok(board) = agg.board(round_id, BoardType::English, Some(10)).await else {
            panic!("board failed");
        };
        assert!(board.is_empty());
    }
}
