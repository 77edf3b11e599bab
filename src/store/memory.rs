//! In-memory implementation of the league store.
//!
//! Used by the test suite and for local runs without PostgreSQL. A single
//! `RwLock` over the whole state gives every method the same atomicity the
//! SQL implementation gets from transactions; in particular
//! [`finalize_round`](super::LeagueStore::finalize_round) performs its
//! conditional status check and all inserts under one write guard.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::LeagueStore;
use super::models::{
    ActivityEvent, ExcludedChannel, LeagueOverview, LeagueUser, Round, RoundStatus, RoundWinner,
};
use crate::domain::{ActivityTotals, BoardType, ChannelId, RoundId, UserId};
use crate::error::LeagueError;

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, LeagueUser>,
    rounds: Vec<Round>,
    events: Vec<ActivityEvent>,
    winners: Vec<RoundWinner>,
    recipients: HashMap<RoundId, BTreeSet<UserId>>,
    excluded: HashMap<ChannelId, ExcludedChannel>,
}

/// League store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Winner snapshots recorded so far (test observability).
    pub async fn winners(&self) -> Vec<RoundWinner> {
        self.state.read().await.winners.clone()
    }

    /// All rounds ever opened, in insertion order (test observability).
    pub async fn rounds(&self) -> Vec<Round> {
        self.state.read().await.rounds.clone()
    }

    fn board_member(user: &LeagueUser, board: BoardType) -> bool {
        if !user.opted_in || user.banned {
            return false;
        }
        match board {
            BoardType::Spanish => user.learning_spanish,
            BoardType::English => user.learning_english,
            BoardType::Combined => true,
        }
    }

    fn totals_for(state: &State, user_id: UserId, round_id: RoundId) -> (i64, i64) {
        let mut points = 0;
        let mut days = BTreeSet::new();
        for event in &state.events {
            if event.user_id == user_id && event.round_id == round_id {
                points += event.points;
                days.insert(event.created_at.date_naive());
            }
        }
        (points, days.len() as i64)
    }
}

#[async_trait::async_trait]
impl LeagueStore for MemoryStore {
    async fn upsert_member(
        &self,
        user_id: UserId,
        username: &str,
        learning_spanish: bool,
        learning_english: bool,
    ) -> Result<(), LeagueError> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        state
            .users
            .entry(user_id)
            .and_modify(|u| {
                u.opted_in = true;
                u.username = username.to_string();
                u.learning_spanish = learning_spanish;
                u.learning_english = learning_english;
                u.updated_at = now;
            })
            .or_insert_with(|| LeagueUser {
                user_id,
                username: username.to_string(),
                opted_in: true,
                banned: false,
                learning_spanish,
                learning_english,
                joined_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn opt_out(&self, user_id: UserId) -> Result<bool, LeagueError> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.opted_in = false;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool, LeagueError> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.banned = banned;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn member(&self, user_id: UserId) -> Result<Option<LeagueUser>, LeagueError> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn exclude_channel(
        &self,
        channel_id: ChannelId,
        channel_name: Option<&str>,
        added_by: UserId,
    ) -> Result<(), LeagueError> {
        let mut state = self.state.write().await;
        state.excluded.insert(
            channel_id,
            ExcludedChannel {
                channel_id,
                channel_name: channel_name.map(ToString::to_string),
                added_by,
                added_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn include_channel(&self, channel_id: ChannelId) -> Result<bool, LeagueError> {
        Ok(self.state.write().await.excluded.remove(&channel_id).is_some())
    }

    async fn is_channel_excluded(&self, channel_id: ChannelId) -> Result<bool, LeagueError> {
        Ok(self.state.read().await.excluded.contains_key(&channel_id))
    }

    async fn excluded_channels(&self) -> Result<Vec<ExcludedChannel>, LeagueError> {
        let state = self.state.read().await;
        let mut channels: Vec<ExcludedChannel> = state.excluded.values().cloned().collect();
        channels.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(channels)
    }

    async fn active_round(&self) -> Result<Option<Round>, LeagueError> {
        let state = self.state.read().await;
        Ok(state
            .rounds
            .iter()
            .find(|r| r.status == RoundStatus::Active)
            .cloned())
    }

    async fn open_round(&self, round: &Round) -> Result<(), LeagueError> {
        self.state.write().await.rounds.push(round.clone());
        Ok(())
    }

    async fn completed_round_before(
        &self,
        round_number: i64,
    ) -> Result<Option<Round>, LeagueError> {
        let state = self.state.read().await;
        Ok(state
            .rounds
            .iter()
            .filter(|r| r.status == RoundStatus::Completed && r.round_number < round_number)
            .max_by_key(|r| r.round_number)
            .cloned())
    }

    async fn latest_completed_round(&self) -> Result<Option<Round>, LeagueError> {
        let state = self.state.read().await;
        Ok(state
            .rounds
            .iter()
            .filter(|r| r.status == RoundStatus::Completed)
            .max_by_key(|r| r.round_number)
            .cloned())
    }

    async fn finalize_round(
        &self,
        round_id: RoundId,
        winners: &[RoundWinner],
        recipients: &[UserId],
        next: &Round,
    ) -> Result<bool, LeagueError> {
        let mut state = self.state.write().await;

        // Conditional transition under the write guard: only one caller can
        // observe the round as still ACTIVE.
        let Some(round) = state
            .rounds
            .iter_mut()
            .find(|r| r.round_id == round_id && r.status == RoundStatus::Active)
        else {
            return Ok(false);
        };
        round.status = RoundStatus::Completed;

        state.winners.extend_from_slice(winners);
        state
            .recipients
            .entry(round_id)
            .or_default()
            .extend(recipients.iter().copied());
        state.rounds.push(next.clone());
        Ok(true)
    }

    async fn record_event(&self, event: &ActivityEvent) -> Result<(), LeagueError> {
        self.state.write().await.events.push(event.clone());
        Ok(())
    }

    async fn daily_event_count(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, LeagueError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.created_at >= since)
            .count() as i64)
    }

    async fn board_totals(
        &self,
        round_id: RoundId,
        board: BoardType,
    ) -> Result<Vec<ActivityTotals>, LeagueError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| Self::board_member(u, board))
            .map(|u| {
                let (points, active_days) = Self::totals_for(&state, u.user_id, round_id);
                ActivityTotals {
                    user_id: u.user_id,
                    username: u.username.clone(),
                    points,
                    active_days,
                }
            })
            .collect())
    }

    async fn member_totals(
        &self,
        user_id: UserId,
        round_id: RoundId,
    ) -> Result<(i64, i64), LeagueError> {
        let state = self.state.read().await;
        Ok(Self::totals_for(&state, user_id, round_id))
    }

    async fn role_recipients(&self, round_id: RoundId) -> Result<Vec<UserId>, LeagueError> {
        let state = self.state.read().await;
        Ok(state
            .recipients
            .get(&round_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn add_role_recipients(
        &self,
        round_id: RoundId,
        users: &[UserId],
    ) -> Result<(), LeagueError> {
        let mut state = self.state.write().await;
        state
            .recipients
            .entry(round_id)
            .or_default()
            .extend(users.iter().copied());
        Ok(())
    }

    async fn overview(&self, round_id: RoundId) -> Result<LeagueOverview, LeagueError> {
        let state = self.state.read().await;
        let active = |u: &&LeagueUser| u.opted_in && !u.banned;
        Ok(LeagueOverview {
            total_users: state.users.values().filter(active).count() as i64,
            spanish_learners: state
                .users
                .values()
                .filter(active)
                .filter(|u| u.learning_spanish)
                .count() as i64,
            english_learners: state
                .users
                .values()
                .filter(active)
                .filter(|u| u.learning_english)
                .count() as i64,
            banned_users: state.users.values().filter(|u| u.banned).count() as i64,
            events_this_round: state
                .events
                .iter()
                .filter(|e| e.round_id == round_id)
                .count() as i64,
            excluded_channels: state.excluded.len() as i64,
        })
    }
}
