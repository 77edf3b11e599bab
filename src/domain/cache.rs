//! Short-TTL cache for ranked leaderboards.
//!
//! Entries are keyed per (board, limit) request shape and served while
//! younger than the TTL. Any activity write or round close invalidates the
//! whole cache rather than tracking which boards a write touched.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use super::{BoardType, RankedEntry};

/// Cache key: board plus the requested row limit (`None` = full board).
pub type BoardKey = (BoardType, Option<u32>);

#[derive(Debug, Clone)]
struct CachedBoard {
    entries: Vec<RankedEntry>,
    stored_at: Instant,
}

/// Process-local leaderboard cache with wholesale invalidation.
#[derive(Debug)]
pub struct LeaderboardCache {
    ttl: Duration,
    slots: RwLock<HashMap<BoardKey, CachedBoard>>,
}

impl LeaderboardCache {
    /// Creates a cache whose entries are served for `ttl` after storage.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached board for `key` when younger than the TTL.
    pub async fn get(&self, key: &BoardKey) -> Option<Vec<RankedEntry>> {
        let slots = self.slots.read().await;
        slots
            .get(key)
            .filter(|slot| slot.stored_at.elapsed() < self.ttl)
            .map(|slot| slot.entries.clone())
    }

    /// Stores a freshly computed board under `key`.
    pub async fn put(&self, key: BoardKey, entries: Vec<RankedEntry>) {
        let mut slots = self.slots.write().await;
        slots.insert(
            key,
            CachedBoard {
                entries,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops every cached board.
    pub async fn invalidate_all(&self) {
        self.slots.write().await.clear();
    }

    /// Number of cached boards (expired entries included until overwritten).
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Returns `true` when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    const TTL: Duration = Duration::from_secs(30);

    fn board(score: i64) -> Vec<RankedEntry> {
        vec![RankedEntry {
            rank: 1,
            user_id: UserId::new(1),
            username: "alice".to_string(),
            total_score: score,
            active_days: 1,
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn serves_fresh_entries() {
        let cache = LeaderboardCache::new(TTL);
        let key = (BoardType::Spanish, Some(10));

        cache.put(key, board(7)).await;
        tokio::time::advance(Duration::from_secs(29)).await;

        let hit = cache.get(&key).await;
        let Some(hit) = hit else {
            panic!("expected cache hit");
        };
        assert_eq!(hit.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_ttl() {
        let cache = LeaderboardCache::new(TTL);
        let key = (BoardType::English, Some(10));

        cache.put(key, board(7)).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_per_board_and_limit() {
        let cache = LeaderboardCache::new(TTL);
        cache.put((BoardType::Spanish, Some(10)), board(1)).await;

        assert!(cache.get(&(BoardType::Spanish, Some(25))).await.is_none());
        assert!(cache.get(&(BoardType::English, Some(10))).await.is_none());
        assert!(cache.get(&(BoardType::Spanish, None)).await.is_none());
        assert!(cache.get(&(BoardType::Spanish, Some(10))).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_all_clears_every_slot() {
        let cache = LeaderboardCache::new(TTL);
        cache.put((BoardType::Spanish, Some(10)), board(1)).await;
        cache.put((BoardType::Combined, None), board(2)).await;
        assert_eq!(cache.len().await, 2);

        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
        assert!(cache.get(&(BoardType::Spanish, Some(10))).await.is_none());
    }
}
