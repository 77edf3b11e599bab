//! Appends qualifying events to the activity log.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{ChannelId, LeaderboardCache, RoundId, UserId};
use crate::error::LeagueError;
use crate::store::models::ActivityEvent;
use crate::store::LeagueStore;

/// Writes accepted events and keeps the leaderboard cache honest.
///
/// Writes are independent and may interleave freely; a store failure means
/// the event is simply not recorded (no partial state).
#[derive(Debug)]
pub struct ActivityRecorder {
    store: Arc<dyn LeagueStore>,
    cache: Arc<LeaderboardCache>,
}

impl ActivityRecorder {
    /// Creates a recorder over the store and the shared cache.
    #[must_use]
    pub fn new(store: Arc<dyn LeagueStore>, cache: Arc<LeaderboardCache>) -> Self {
        Self { store, cache }
    }

    /// Appends one event and invalidates every cached board.
    ///
    /// # Errors
    ///
    /// Propagates store failures to the caller; nothing is cached or
    /// partially written in that case.
    pub async fn record(
        &self,
        user_id: UserId,
        round_id: RoundId,
        channel_id: ChannelId,
        points: i64,
        source_event_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<(), LeagueError> {
        self.store
            .record_event(&ActivityEvent {
                user_id,
                round_id,
                channel_id,
                points,
                source_event_id,
                created_at: at,
            })
            .await?;
        self.cache.invalidate_all().await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::BoardType;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn record_appends_and_invalidates_cache() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        cache.put((BoardType::Combined, None), Vec::new()).await;

        let recorder = ActivityRecorder::new(Arc::clone(&store) as Arc<dyn LeagueStore>, Arc::clone(&cache));
        let round_id = RoundId::new();
        let Ok(()) = recorder
            .record(UserId::new(1), round_id, ChannelId::new(2), 1, Some(9), Utc::now())
            .await
        else {
            panic!("record failed");
        };

        assert!(cache.is_empty().await);
        let Ok(count) = store
            .daily_event_count(UserId::new(1), Utc::now() - chrono::Duration::hours(1))
            .await
        else {
            panic!("count failed");
        };
        assert_eq!(count, 1);
    }
}
