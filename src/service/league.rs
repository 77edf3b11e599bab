//! League command surface: membership, ingestion, standings, admin.
//!
//! Orchestrates the gate, recorder, and aggregator. Every command returns a
//! typed [`LeagueError`] instead of panicking so callers can render a
//! message and keep the host process alive.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{BoardType, ChannelId, RankedEntry, UserId};
use crate::error::LeagueError;
use crate::service::gate::{ActivityGate, GateDecision, InboundEvent};
use crate::service::leaderboard::LeaderboardAggregator;
use crate::service::recorder::ActivityRecorder;
use crate::store::models::{ExcludedChannel, LeagueOverview};
use crate::store::LeagueStore;

/// Maximum rows a leaderboard query may request.
const MAX_BOARD_LIMIT: u32 = 25;

/// Per-user stats for the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    /// Display name.
    pub username: String,
    /// Points earned this round.
    pub total_points: i64,
    /// Distinct active days this round.
    pub active_days: i64,
    /// Points plus the active-day bonus.
    pub total_score: i64,
    /// Rank on the Spanish board, when the flag is set.
    pub rank_spanish: Option<u32>,
    /// Rank on the English board, when the flag is set.
    pub rank_english: Option<u32>,
    /// Rank on the combined board.
    pub rank_combined: Option<u32>,
}

/// Facade over the league's produced command interface.
#[derive(Debug)]
pub struct LeagueService {
    store: Arc<dyn LeagueStore>,
    gate: ActivityGate,
    recorder: ActivityRecorder,
    leaderboard: Arc<LeaderboardAggregator>,
    points_per_event: i64,
}

impl LeagueService {
    /// Creates the service over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn LeagueStore>,
        gate: ActivityGate,
        recorder: ActivityRecorder,
        leaderboard: Arc<LeaderboardAggregator>,
        points_per_event: i64,
    ) -> Self {
        Self {
            store,
            gate,
            recorder,
            leaderboard,
            points_per_event,
        }
    }

    // ── Membership ──────────────────────────────────────────────────────

    /// Opts a user in, creating or re-activating their row.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::InvalidRequest`] unless exactly one learning
    /// language is selected.
    pub async fn join(
        &self,
        user_id: UserId,
        username: &str,
        learning_spanish: bool,
        learning_english: bool,
    ) -> Result<(), LeagueError> {
        if learning_spanish == learning_english {
            return Err(LeagueError::InvalidRequest(
                "pick exactly one learning language".to_string(),
            ));
        }
        self.store
            .upsert_member(user_id, username, learning_spanish, learning_english)
            .await?;
        info!(%user_id, username, learning_spanish, learning_english, "user joined league");
        Ok(())
    }

    /// Opts a user out, preserving history. Returns `false` when the user
    /// was never in the league.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn leave(&self, user_id: UserId) -> Result<bool, LeagueError> {
        let existed = self.store.opt_out(user_id).await?;
        if existed {
            info!(%user_id, "user left league");
        }
        Ok(existed)
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    /// Runs one inbound event through the gate and records it when it
    /// qualifies. Rejection is silent: the decision is returned for
    /// observability but nothing is persisted or retried.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the gate checks or the append; a
    /// failed append leaves no partial state.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<GateDecision, LeagueError> {
        let decision = self.gate.evaluate(&event).await?;
        let GateDecision::Accepted = decision else {
            debug!(user_id = %event.user_id, channel_id = %event.channel_id, ?decision, "event rejected");
            return Ok(decision);
        };

        let Some(round) = self.store.active_round().await? else {
            debug!(user_id = %event.user_id, "event dropped, no active round");
            return Ok(GateDecision::Rejected(
                crate::service::gate::RejectReason::NoActiveRound,
            ));
        };

        self.recorder
            .record(
                event.user_id,
                round.round_id,
                event.channel_id,
                self.points_per_event,
                event.source_event_id,
                event.timestamp,
            )
            .await?;
        debug!(user_id = %event.user_id, round_id = %round.round_id, "event counted");
        Ok(GateDecision::Accepted)
    }

    // ── Standings ───────────────────────────────────────────────────────

    /// Ranked standings for a board, limited to `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::InvalidRequest`] for a limit outside
    /// `1..=25`, or [`LeagueError::NoActiveRound`] when nothing is open.
    pub async fn get_leaderboard(
        &self,
        board: BoardType,
        limit: u32,
    ) -> Result<Vec<RankedEntry>, LeagueError> {
        if limit == 0 || limit > MAX_BOARD_LIMIT {
            return Err(LeagueError::InvalidRequest(format!(
                "limit must be between 1 and {MAX_BOARD_LIMIT}"
            )));
        }
        let round = self
            .store
            .active_round()
            .await?
            .ok_or(LeagueError::NoActiveRound)?;
        self.leaderboard.board(round.round_id, board, Some(limit)).await
    }

    /// Current-round stats and per-board ranks for one participant.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::UserNotFound`] for unknown, opted-out, or
    /// banned users, matching the board filters.
    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats, LeagueError> {
        let user = self
            .store
            .member(user_id)
            .await?
            .filter(|u| u.opted_in && !u.banned)
            .ok_or(LeagueError::UserNotFound(user_id))?;

        let round = self
            .store
            .active_round()
            .await?
            .ok_or(LeagueError::NoActiveRound)?;

        let (total_points, active_days) =
            self.store.member_totals(user_id, round.round_id).await?;

        let rank_spanish = if user.learning_spanish {
            self.leaderboard
                .rank_of(round.round_id, BoardType::Spanish, user_id)
                .await?
        } else {
            None
        };
        let rank_english = if user.learning_english {
            self.leaderboard
                .rank_of(round.round_id, BoardType::English, user_id)
                .await?
        } else {
            None
        };
        let rank_combined = self
            .leaderboard
            .rank_of(round.round_id, BoardType::Combined, user_id)
            .await?;

        Ok(UserStats {
            username: user.username,
            total_points,
            active_days,
            total_score: crate::domain::total_score(
                total_points,
                active_days,
                self.leaderboard_bonus(),
            ),
            rank_spanish,
            rank_english,
            rank_combined,
        })
    }

    // ── Admin ───────────────────────────────────────────────────────────

    /// Bans a user from scoring. Returns `false` for unknown users.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn ban(&self, user_id: UserId) -> Result<bool, LeagueError> {
        let existed = self.store.set_banned(user_id, true).await?;
        if existed {
            info!(%user_id, "user banned from league");
        }
        Ok(existed)
    }

    /// Lifts a ban. Returns `false` for unknown users.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn unban(&self, user_id: UserId) -> Result<bool, LeagueError> {
        let existed = self.store.set_banned(user_id, false).await?;
        if existed {
            info!(%user_id, "user unbanned from league");
        }
        Ok(existed)
    }

    /// Excludes a channel from tracking.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn exclude_channel(
        &self,
        channel_id: ChannelId,
        channel_name: Option<&str>,
        added_by: UserId,
    ) -> Result<(), LeagueError> {
        self.store
            .exclude_channel(channel_id, channel_name, added_by)
            .await?;
        info!(%channel_id, %added_by, "channel excluded from tracking");
        Ok(())
    }

    /// Re-includes a channel. Returns `false` when it was not excluded.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn include_channel(&self, channel_id: ChannelId) -> Result<bool, LeagueError> {
        let removed = self.store.include_channel(channel_id).await?;
        if removed {
            info!(%channel_id, "channel re-included in tracking");
        }
        Ok(removed)
    }

    /// Lists the exclusion list, most recently added first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn excluded_channels(&self) -> Result<Vec<ExcludedChannel>, LeagueError> {
        self.store.excluded_channels().await
    }

    /// Admin overview counters for the current round.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::NoActiveRound`] when nothing is open.
    pub async fn overview(&self) -> Result<LeagueOverview, LeagueError> {
        let round = self
            .store
            .active_round()
            .await?
            .ok_or(LeagueError::NoActiveRound)?;
        self.store.overview(round.round_id).await
    }

    fn leaderboard_bonus(&self) -> i64 {
        self.leaderboard.active_day_bonus()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{CooldownTracker, LeaderboardCache};
    use crate::external::{Language, LanguageDetector};
    use crate::store::models::{Round, RoundStatus};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    const GUILD: i64 = 900;

    #[derive(Debug)]
    struct SpanishDetector;

    #[async_trait::async_trait]
    impl LanguageDetector for SpanishDetector {
        async fn detect(&self, _text: &str) -> Option<Language> {
            Some(Language::Spanish)
        }
    }

    struct Fixture {
        service: LeagueService,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let round = Round {
            round_id: crate::domain::RoundId::new(),
            round_number: 1,
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::days(7),
            status: RoundStatus::Active,
        };
        let Ok(()) = store.open_round(&round).await else {
            panic!("open_round failed");
        };

        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        let dyn_store = Arc::clone(&store) as Arc<dyn LeagueStore>;
        let gate = ActivityGate::new(
            Arc::clone(&dyn_store),
            Arc::new(SpanishDetector),
            Arc::new(CooldownTracker::new(tokio::time::Duration::from_secs(120))),
            GUILD,
            50,
            10,
        );
        let recorder = ActivityRecorder::new(Arc::clone(&dyn_store), Arc::clone(&cache));
        let leaderboard = Arc::new(LeaderboardAggregator::new(
            Arc::clone(&dyn_store),
            cache,
            5,
        ));
        let service = LeagueService::new(dyn_store, gate, recorder, leaderboard, 1);
        Fixture { service }
    }

    fn event(user: i64, channel: i64) -> InboundEvent {
        InboundEvent {
            user_id: UserId::new(user),
            channel_id: ChannelId::new(channel),
            guild_id: Some(GUILD),
            content: "hola, ¿cómo va todo por ahí hoy?".to_string(),
            source_event_id: Some(1),
            timestamp: Utc::now(),
            from_bot: false,
        }
    }

    #[tokio::test]
    async fn join_requires_exactly_one_language() {
        let fix = fixture().await;
        let both = fix.service.join(UserId::new(1), "alice", true, true).await;
        let neither = fix.service.join(UserId::new(1), "alice", false, false).await;
        assert!(matches!(both, Err(LeagueError::InvalidRequest(_))));
        assert!(matches!(neither, Err(LeagueError::InvalidRequest(_))));

        let Ok(()) = fix.service.join(UserId::new(1), "alice", true, false).await else {
            panic!("valid join failed");
        };
    }

    #[tokio::test]
    async fn leave_reports_membership() {
        let fix = fixture().await;
        let Ok(false) = fix.service.leave(UserId::new(1)).await else {
            panic!("leave of unknown user should report false");
        };

        let Ok(()) = fix.service.join(UserId::new(1), "alice", true, false).await else {
            panic!("join failed");
        };
        let Ok(true) = fix.service.leave(UserId::new(1)).await else {
            panic!("leave failed");
        };
    }

    #[tokio::test]
    async fn accepted_events_show_up_on_the_board() {
        let fix = fixture().await;
        let Ok(()) = fix.service.join(UserId::new(1), "alice", true, false).await else {
            panic!("join failed");
        };

        let Ok(GateDecision::Accepted) = fix.service.handle_event(event(1, 5)).await else {
            panic!("event should count");
        };

        let Ok(board) = fix.service.get_leaderboard(BoardType::Spanish, 10).await else {
            panic!("leaderboard failed");
        };
        let Some(top) = board.first() else {
            panic!("board empty");
        };
        assert_eq!(top.user_id, UserId::new(1));
        // 1 point + 1 active day * 5.
        assert_eq!(top.total_score, 6);
    }

    #[tokio::test]
    async fn leaderboard_limit_is_validated() {
        let fix = fixture().await;
        assert!(matches!(
            fix.service.get_leaderboard(BoardType::Combined, 0).await,
            Err(LeagueError::InvalidRequest(_))
        ));
        assert!(matches!(
            fix.service.get_leaderboard(BoardType::Combined, 26).await,
            Err(LeagueError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn stats_cover_score_and_ranks() {
        let fix = fixture().await;
        let Ok(()) = fix.service.join(UserId::new(1), "alice", true, false).await else {
            panic!("join failed");
        };
        let Ok(()) = fix.service.join(UserId::new(2), "bob", false, true).await else {
            panic!("join failed");
        };
        let Ok(GateDecision::Accepted) = fix.service.handle_event(event(1, 5)).await else {
            panic!("event should count");
        };

        let Ok(stats) = fix.service.user_stats(UserId::new(1)).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.username, "alice");
        assert_eq!(stats.total_points, 1);
        assert_eq!(stats.active_days, 1);
        assert_eq!(stats.total_score, 6);
        assert_eq!(stats.rank_spanish, Some(1));
        assert_eq!(stats.rank_english, None);
        assert_eq!(stats.rank_combined, Some(1));
    }

    #[tokio::test]
    async fn stats_for_unknown_user_is_a_typed_error() {
        let fix = fixture().await;
        let Err(err) = fix.service.user_stats(UserId::new(404)).await else {
            panic!("expected error");
        };
        assert!(matches!(err, LeagueError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn banned_users_stop_scoring_until_unbanned() {
        let fix = fixture().await;
        let Ok(()) = fix.service.join(UserId::new(1), "alice", true, false).await else {
            panic!("join failed");
        };
        let Ok(true) = fix.service.ban(UserId::new(1)).await else {
            panic!("ban failed");
        };

        let Ok(GateDecision::Rejected(reason)) = fix.service.handle_event(event(1, 5)).await else {
            panic!("event should be rejected");
        };
        assert_eq!(reason, crate::service::gate::RejectReason::Banned);

        let Ok(true) = fix.service.unban(UserId::new(1)).await else {
            panic!("unban failed");
        };
        let Ok(GateDecision::Accepted) = fix.service.handle_event(event(1, 6)).await else {
            panic!("event should count after unban");
        };
    }

    #[tokio::test]
    async fn overview_counts_participants_and_events() {
        let fix = fixture().await;
        let Ok(()) = fix.service.join(UserId::new(1), "alice", true, false).await else {
            panic!("join failed");
        };
        let Ok(()) = fix.service.join(UserId::new(2), "bob", false, true).await else {
            panic!("join failed");
        };
        let Ok(GateDecision::Accepted) = fix.service.handle_event(event(1, 5)).await else {
            panic!("event should count");
        };
        let Ok(()) = fix
            .service
            .exclude_channel(ChannelId::new(9), Some("memes"), UserId::new(0))
            .await
        else {
            panic!("exclude failed");
        };

        let Ok(overview) = fix.service.overview().await else {
            panic!("overview failed");
        };
        assert_eq!(overview.total_users, 2);
        assert_eq!(overview.spanish_learners, 1);
        assert_eq!(overview.english_learners, 1);
        assert_eq!(overview.events_this_round, 1);
        assert_eq!(overview.excluded_channels, 1);

        let Ok(channels) = fix.service.excluded_channels().await else {
            panic!("excluded_channels failed");
        };
        assert_eq!(channels.len(), 1);
    }
}
