//! Per-(user, channel) rate-limit state.
//!
//! [`CooldownTracker`] is the process-local map behind the gate's anti-spam
//! check. It is constructed once at startup and torn down at shutdown; a
//! periodic sweep evicts stale stamps so the map stays bounded.
//!
//! # Concurrency
//!
//! A single `RwLock` guards the map. A lost or duplicated stamp between a
//! concurrent `is_ready` and `stamp` on the same key is an accepted benign
//! race: at worst one extra event is counted.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use super::{ChannelId, UserId};

/// Tracks the last counted event per (user, channel) pair.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    stamps: RwLock<HashMap<(UserId, ChannelId), Instant>>,
}

impl CooldownTracker {
    /// Creates a tracker with the given cooldown window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` when the pair has no stamp inside the cooldown window.
    pub async fn is_ready(&self, user_id: UserId, channel_id: ChannelId) -> bool {
        let stamps = self.stamps.read().await;
        match stamps.get(&(user_id, channel_id)) {
            Some(last) => last.elapsed() >= self.window,
            None => true,
        }
    }

    /// Records a counted event for the pair at the current instant.
    pub async fn stamp(&self, user_id: UserId, channel_id: ChannelId) {
        let mut stamps = self.stamps.write().await;
        stamps.insert((user_id, channel_id), Instant::now());
    }

    /// Evicts stamps older than twice the cooldown window.
    ///
    /// Returns the number of entries removed. Called from the background
    /// sweep task to bound memory.
    pub async fn sweep(&self) -> usize {
        let horizon = self.window * 2;
        let mut stamps = self.stamps.write().await;
        let before = stamps.len();
        stamps.retain(|_, last| last.elapsed() < horizon);
        before - stamps.len()
    }

    /// Number of tracked pairs.
    pub async fn len(&self) -> usize {
        self.stamps.read().await.len()
    }

    /// Returns `true` when no pair is tracked.
    pub async fn is_empty(&self) -> bool {
        self.stamps.read().await.is_empty()
    }
}
