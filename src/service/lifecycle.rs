//! Round lifecycle: the ACTIVE → COMPLETED state machine and its
//! close/reopen sequence.
//!
//! A periodic tick and the admin end-round command both funnel into
//! [`RoundLifecycle::close_if_due`]. The sequence is serialized two ways:
//! an in-process mutex keeps the scheduler and admin path from interleaving,
//! and the store's conditional COMPLETED update keeps a second process from
//! committing the same close. External role and notification calls run after
//! the commit and never abort the transition.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{
    eligible_champions, next_round_end, BoardType, LeaderboardCache, RankedEntry, RoundId, UserId,
};
use crate::error::LeagueError;
use crate::external::RoleApi;
use crate::service::announcer::RoundAnnouncer;
use crate::service::leaderboard::LeaderboardAggregator;
use crate::store::models::{Round, RoundStatus, RoundWinner};
use crate::store::LeagueStore;

/// What asked for the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
    /// Periodic boundary check; closes only when `now >= end_time`.
    Scheduled,
    /// Administrative end-round command; closes unconditionally.
    Admin,
}

/// Read-only result of the close computation.
///
/// Produced by [`RoundLifecycle::preview`] and reused verbatim by the real
/// close, so a dry run always shows exactly what a close would commit.
#[derive(Debug, Clone)]
pub struct ClosePlan {
    /// The round being closed.
    pub round: Round,
    /// Top entries per language board (winner fetch buffer, not just 3).
    pub boards: Vec<(BoardType, Vec<RankedEntry>)>,
    /// Winner snapshot rows to persist.
    pub winners: Vec<RoundWinner>,
    /// Merged, de-duplicated champion list across boards.
    pub champions: Vec<RankedEntry>,
    /// Users ineligible this round because they were champions last round.
    pub cooldown: HashSet<UserId>,
}

/// A committed close.
#[derive(Debug, Clone)]
pub struct CloseOutcome {
    /// The plan that was committed.
    pub plan: ClosePlan,
    /// The newly opened round.
    pub next: Round,
}

/// Owns the round state machine.
#[derive(Debug)]
pub struct RoundLifecycle {
    store: Arc<dyn LeagueStore>,
    leaderboard: Arc<LeaderboardAggregator>,
    cache: Arc<LeaderboardCache>,
    roles: Arc<dyn RoleApi>,
    announcer: RoundAnnouncer,
    champions_per_board: usize,
    winner_fetch_limit: u32,
    close_lock: Mutex<()>,
}

impl RoundLifecycle {
    /// Creates the lifecycle manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn LeagueStore>,
        leaderboard: Arc<LeaderboardAggregator>,
        cache: Arc<LeaderboardCache>,
        roles: Arc<dyn RoleApi>,
        announcer: RoundAnnouncer,
        champions_per_board: usize,
        winner_fetch_limit: u32,
    ) -> Self {
        Self {
            store,
            leaderboard,
            cache,
            roles,
            announcer,
            champions_per_board,
            winner_fetch_limit,
            close_lock: Mutex::new(()),
        }
    }

    /// Opens the first round when none is ACTIVE (startup bootstrap).
    ///
    /// Safe to call on every start: a crash between close-commit and
    /// anything after it leaves the successor round in place, so this
    /// becomes a no-op.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn ensure_active_round(&self) -> Result<Round, LeagueError> {
        let _guard = self.close_lock.lock().await;
        if let Some(round) = self.store.active_round().await? {
            return Ok(round);
        }

        let now = Utc::now();
        let round_number = self
            .store
            .latest_completed_round()
            .await?
            .map_or(1, |r| r.round_number + 1);
        let round = Round {
            round_id: RoundId::new(),
            round_number,
            start_time: now,
            end_time: next_round_end(now),
            status: RoundStatus::Active,
        };
        self.store.open_round(&round).await?;
        info!(round_id = %round.round_id, round_number, end_time = %round.end_time, "opened round");
        Ok(round)
    }

    /// Closes the ACTIVE round if due (or unconditionally for
    /// [`CloseTrigger::Admin`]) and opens its successor.
    ///
    /// Returns `Ok(None)` when there is nothing to do: no ACTIVE round, a
    /// scheduled tick before the boundary, or a concurrent closer already
    /// committed.
    ///
    /// # Errors
    ///
    /// Store failures abort the close; the round stays ACTIVE and a retry
    /// is safe.
    pub async fn close_if_due(
        &self,
        trigger: CloseTrigger,
    ) -> Result<Option<CloseOutcome>, LeagueError> {
        let _guard = self.close_lock.lock().await;

        let Some(round) = self.store.active_round().await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if trigger == CloseTrigger::Scheduled && now < round.end_time {
            return Ok(None);
        }

        let plan = self.compute_close_plan(&round).await?;
        let next = Round {
            round_id: RoundId::new(),
            round_number: round.round_number + 1,
            start_time: now,
            end_time: next_round_end(now),
            status: RoundStatus::Active,
        };
        let recipients: Vec<UserId> = plan.champions.iter().map(|c| c.user_id).collect();

        let committed = self
            .store
            .finalize_round(round.round_id, &plan.winners, &recipients, &next)
            .await?;
        if !committed {
            info!(round_id = %round.round_id, "close lost the race, skipping");
            return Ok(None);
        }

        self.cache.invalidate_all().await;

        info!(
            round_id = %round.round_id,
            round_number = round.round_number,
            winners = plan.winners.len(),
            champions = plan.champions.len(),
            next_round = %next.round_id,
            "round closed"
        );

        // Best-effort external side effects; the commit above is the source
        // of truth either way.
        self.reconcile_roles(&plan).await;
        self.announcer
            .announce(&plan.round, &plan.boards, &plan.champions, &plan.cooldown)
            .await;

        Ok(Some(CloseOutcome { plan, next }))
    }

    /// Read-only dry run of the close computation. No state changes.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::NoActiveRound`] when nothing is open, or a
    /// store failure from the computation.
    pub async fn preview(&self) -> Result<ClosePlan, LeagueError> {
        let _guard = self.close_lock.lock().await;
        let round = self
            .store
            .active_round()
            .await?
            .ok_or(LeagueError::NoActiveRound)?;
        self.compute_close_plan(&round).await
    }

    /// Records champion holders for the most recently completed round
    /// without touching external role state (migration utility).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::NoCompletedRound`] when no round has been
    /// completed yet.
    pub async fn seed_role_recipients(&self, users: &[UserId]) -> Result<Round, LeagueError> {
        let round = self
            .store
            .latest_completed_round()
            .await?
            .ok_or(LeagueError::NoCompletedRound)?;
        self.store.add_role_recipients(round.round_id, users).await?;
        info!(round_id = %round.round_id, seeded = users.len(), "seeded role recipients");
        Ok(round)
    }

    /// Fetches boards, picks winners and champions, and resolves the
    /// cooldown set. Pure reads; the caller decides whether to commit.
    async fn compute_close_plan(&self, round: &Round) -> Result<ClosePlan, LeagueError> {
        let cooldown: HashSet<UserId> = match self
            .store
            .completed_round_before(round.round_number)
            .await?
        {
            Some(previous) => self
                .store
                .role_recipients(previous.round_id)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        let mut boards = Vec::with_capacity(BoardType::LANGUAGE_BOARDS.len());
        let mut winners = Vec::new();
        let mut champions: Vec<RankedEntry> = Vec::new();

        for board in BoardType::LANGUAGE_BOARDS {
            let ranked = self
                .leaderboard
                .board(round.round_id, board, Some(self.winner_fetch_limit))
                .await?;

            for entry in ranked.iter().take(self.champions_per_board) {
                winners.push(RoundWinner {
                    round_id: round.round_id,
                    user_id: entry.user_id,
                    league: board,
                    rank: entry.rank as i32,
                    total_score: entry.total_score,
                    active_days: entry.active_days,
                });
            }

            for candidate in eligible_champions(&ranked, &cooldown, self.champions_per_board) {
                if !champions.iter().any(|c| c.user_id == candidate.user_id) {
                    champions.push(candidate);
                }
            }

            boards.push((board, ranked));
        }

        Ok(ClosePlan {
            round: round.clone(),
            boards,
            winners,
            champions,
            cooldown,
        })
    }

    /// Revokes champion status from last round's holders and grants it to
    /// the new recipients. Per-user failures are logged, never propagated.
    async fn reconcile_roles(&self, plan: &ClosePlan) {
        let mut resting: Vec<UserId> = plan.cooldown.iter().copied().collect();
        resting.sort_unstable();
        for user_id in resting {
            if let Err(e) = self.roles.revoke(user_id, "champion cooldown").await {
                warn!(%user_id, error = %e, "champion revoke failed");
            }
        }

        for champion in &plan.champions {
            if let Err(e) = self.roles.grant(champion.user_id, "round champion").await {
                warn!(user_id = %champion.user_id, error = %e, "champion grant failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, CooldownTracker};
    use crate::external::{ExternalError, NotificationSink};
    use crate::store::models::ActivityEvent;
    use crate::store::MemoryStore;
    use chrono::{Datelike, Duration, Timelike, Weekday};
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Default)]
    struct RecordingRoleApi {
        calls: StdMutex<Vec<(String, UserId)>>,
    }

    #[async_trait::async_trait]
    impl RoleApi for RecordingRoleApi {
        async fn grant(&self, user_id: UserId, _reason: &str) -> Result<(), ExternalError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(("grant".to_string(), user_id));
            }
            Ok(())
        }

        async fn revoke(&self, user_id: UserId, _reason: &str) -> Result<(), ExternalError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(("revoke".to_string(), user_id));
            }
            Ok(())
        }
    }

    impl RecordingRoleApi {
        fn calls(&self) -> Vec<(String, UserId)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        messages: StdMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn send_text(&self, _channel: ChannelId, message: &str) -> Result<(), ExternalError> {
            if let Ok(mut messages) = self.messages.lock() {
                messages.push(message.to_string());
            }
            Ok(())
        }
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().map(|m| m.clone()).unwrap_or_default()
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        lifecycle: RoundLifecycle,
        roles: Arc<RecordingRoleApi>,
        notifier: Arc<RecordingNotifier>,
    }

    fn build(store: &Arc<MemoryStore>) -> (RoundLifecycle, Arc<RecordingRoleApi>, Arc<RecordingNotifier>) {
        let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(30)));
        let leaderboard = Arc::new(LeaderboardAggregator::new(
            Arc::clone(store) as Arc<dyn LeagueStore>,
            Arc::clone(&cache),
            5,
        ));
        let roles = Arc::new(RecordingRoleApi::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let announcer = RoundAnnouncer::new(
            Arc::clone(&notifier) as Arc<dyn NotificationSink>,
            ChannelId::new(777),
        );
        let lifecycle = RoundLifecycle::new(
            Arc::clone(store) as Arc<dyn LeagueStore>,
            leaderboard,
            cache,
            Arc::clone(&roles) as Arc<dyn RoleApi>,
            announcer,
            3,
            10,
        );
        (lifecycle, roles, notifier)
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let (lifecycle, roles, notifier) = build(&store);
        Fixture {
            store,
            lifecycle,
            roles,
            notifier,
        }
    }

    async fn open_overdue_round(store: &MemoryStore, number: i64) -> Round {
        let round = Round {
            round_id: RoundId::new(),
            round_number: number,
            start_time: Utc::now() - Duration::days(7),
            end_time: Utc::now() - Duration::hours(1),
            status: RoundStatus::Active,
        };
        let Ok(()) = store.open_round(&round).await else {
            panic!("open_round failed");
        };
        round
    }

    async fn join_with_activity(fix: &Fixture, round: &Round, id: i64, name: &str, points: i64) {
        let Ok(()) = fix.store.upsert_member(UserId::new(id), name, true, false).await else {
            panic!("upsert failed");
        };
        for i in 0..points {
            let Ok(()) = fix
                .store
                .record_event(&ActivityEvent {
                    user_id: UserId::new(id),
                    round_id: round.round_id,
                    channel_id: ChannelId::new(i),
                    points: 1,
                    source_event_id: None,
                    created_at: Utc::now() - Duration::hours(2),
                })
                .await
            else {
                panic!("record failed");
            };
        }
    }

    #[tokio::test]
    async fn bootstrap_opens_round_one_exactly_once() {
        let fix = fixture();
        let Ok(first) = fix.lifecycle.ensure_active_round().await else {
            panic!("bootstrap failed");
        };
        assert_eq!(first.round_number, 1);
        assert_eq!(first.end_time.weekday(), Weekday::Sun);

        let Ok(second) = fix.lifecycle.ensure_active_round().await else {
            panic!("bootstrap failed");
        };
        assert_eq!(second.round_id, first.round_id);
        assert_eq!(fix.store.rounds().await.len(), 1);
    }

    #[tokio::test]
    async fn scheduled_tick_before_boundary_is_a_noop() {
        let fix = fixture();
        let Ok(round) = fix.lifecycle.ensure_active_round().await else {
            panic!("bootstrap failed");
        };
        assert!(round.end_time > Utc::now());

        let Ok(outcome) = fix.lifecycle.close_if_due(CloseTrigger::Scheduled).await else {
            panic!("close failed");
        };
        assert!(outcome.is_none());
        assert_eq!(fix.store.rounds().await.len(), 1);
    }

    #[tokio::test]
    async fn overdue_close_completes_and_opens_successor() {
        let fix = fixture();
        let round = open_overdue_round(&fix.store, 1).await;
        join_with_activity(&fix, &round, 1, "alice", 4).await;
        join_with_activity(&fix, &round, 2, "bob", 2).await;

        let Ok(Some(outcome)) = fix.lifecycle.close_if_due(CloseTrigger::Scheduled).await else {
            panic!("expected a committed close");
        };

        let rounds = fix.store.rounds().await;
        assert_eq!(rounds.len(), 2);
        let active: Vec<&Round> = rounds.iter().filter(|r| r.status == RoundStatus::Active).collect();
        assert_eq!(active.len(), 1);
        let Some(next) = active.first() else {
            panic!("missing next round");
        };
        assert_eq!(next.round_number, 2);
        assert!(next.end_time > Utc::now());
        assert_eq!(next.end_time.weekday(), Weekday::Sun);
        assert_eq!(next.end_time.hour(), 12);

        // Winners persisted for the spanish board, best first.
        let winners = fix.store.winners().await;
        assert_eq!(winners.len(), 2);
        let Some(top) = winners.first() else {
            panic!("missing winner");
        };
        assert_eq!(top.user_id, UserId::new(1));
        assert_eq!(top.rank, 1);
        assert_eq!(top.total_score, 4 + 5);

        // Champions granted and recorded as recipients.
        let Ok(recipients) = fix.store.role_recipients(round.round_id).await else {
            panic!("recipients failed");
        };
        assert_eq!(recipients, vec![UserId::new(1), UserId::new(2)]);
        assert!(fix.roles.calls().contains(&("grant".to_string(), UserId::new(1))));

        // Announced once.
        let messages = fix.notifier.messages();
        assert_eq!(messages.len(), 1);
        let Some(message) = messages.first() else {
            panic!("missing message");
        };
        assert!(message.contains("Round #1"));
        assert!(message.contains("🥇 alice"));

        assert_eq!(outcome.next.round_number, 2);
        assert_eq!(outcome.plan.champions.len(), 2);
    }

    #[tokio::test]
    async fn previous_champions_rest_for_one_round() {
        let fix = fixture();
        let round1 = open_overdue_round(&fix.store, 1).await;
        join_with_activity(&fix, &round1, 1, "alice", 5).await;
        join_with_activity(&fix, &round1, 2, "bob", 3).await;
        join_with_activity(&fix, &round1, 3, "carol", 2).await;
        join_with_activity(&fix, &round1, 4, "dave", 1).await;

        let Ok(Some(first)) = fix.lifecycle.close_if_due(CloseTrigger::Admin).await else {
            panic!("first close failed");
        };
        // Top three become champions; dave does not.
        let champions1: Vec<i64> = first.plan.champions.iter().map(|c| c.user_id.get()).collect();
        assert_eq!(champions1, vec![1, 2, 3]);

        // Round 2: same standings again.
        let round2 = first.next.clone();
        for (id, points) in [(1, 5), (2, 3), (3, 2), (4, 1)] {
            for i in 0..points {
                let Ok(()) = fix
                    .store
                    .record_event(&ActivityEvent {
                        user_id: UserId::new(id),
                        round_id: round2.round_id,
                        channel_id: ChannelId::new(i),
                        points: 1,
                        source_event_id: None,
                        created_at: Utc::now(),
                    })
                    .await
                else {
                    panic!("record failed");
                };
            }
        }

        let Ok(Some(second)) = fix.lifecycle.close_if_due(CloseTrigger::Admin).await else {
            panic!("second close failed");
        };

        // Last round's champions are resting; only dave is eligible.
        assert_eq!(
            second.plan.cooldown,
            [UserId::new(1), UserId::new(2), UserId::new(3)].into_iter().collect()
        );
        let champions2: Vec<i64> = second.plan.champions.iter().map(|c| c.user_id.get()).collect();
        assert_eq!(champions2, vec![4]);

        // The resting members were revoked in the second reconciliation.
        let revokes: Vec<UserId> = fix
            .roles
            .calls()
            .into_iter()
            .filter(|(kind, _)| kind == "revoke")
            .map(|(_, user)| user)
            .collect();
        assert_eq!(revokes, vec![UserId::new(1), UserId::new(2), UserId::new(3)]);
    }

    #[tokio::test]
    async fn concurrent_closers_commit_exactly_once() {
        // Two lifecycle instances over one store model two processes whose
        // in-process locks cannot protect each other.
        let store = Arc::new(MemoryStore::new());
        let (a, _, _) = build(&store);
        let (b, _, _) = build(&store);

        let round = open_overdue_round(&store, 1).await;
        let Ok(()) = store.upsert_member(UserId::new(1), "alice", true, false).await else {
            panic!("upsert failed");
        };

        let (ra, rb) = tokio::join!(
            a.close_if_due(CloseTrigger::Scheduled),
            b.close_if_due(CloseTrigger::Scheduled)
        );
        let (Ok(ra), Ok(rb)) = (ra, rb) else {
            panic!("close failed");
        };
        assert!(ra.is_some() != rb.is_some(), "exactly one close must commit");

        let rounds = store.rounds().await;
        assert_eq!(rounds.len(), 2);
        assert_eq!(
            rounds.iter().filter(|r| r.status == RoundStatus::Completed).count(),
            1
        );
        assert_eq!(
            rounds.iter().filter(|r| r.status == RoundStatus::Active).count(),
            1
        );

        // One winner snapshot and one recipient set, not two.
        let winners = store.winners().await;
        assert_eq!(winners.len(), 1);
        let Ok(recipients) = store.role_recipients(round.round_id).await else {
            panic!("recipients failed");
        };
        assert_eq!(recipients.len(), 1);
    }

    #[tokio::test]
    async fn preview_mutates_nothing() {
        let fix = fixture();
        let round = open_overdue_round(&fix.store, 1).await;
        join_with_activity(&fix, &round, 1, "alice", 3).await;

        let Ok(plan) = fix.lifecycle.preview().await else {
            panic!("preview failed");
        };
        assert_eq!(plan.round.round_id, round.round_id);
        assert_eq!(plan.champions.len(), 1);

        assert_eq!(fix.store.rounds().await.len(), 1);
        assert!(fix.store.winners().await.is_empty());
        assert!(fix.roles.calls().is_empty());
        assert!(fix.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn preview_without_round_is_a_typed_error() {
        let fix = fixture();
        let Err(err) = fix.lifecycle.preview().await else {
            panic!("expected error");
        };
        assert!(matches!(err, LeagueError::NoActiveRound));
    }

    #[tokio::test]
    async fn seed_requires_a_completed_round() {
        let fix = fixture();
        let Err(err) = fix.lifecycle.seed_role_recipients(&[UserId::new(1)]).await else {
            panic!("expected error");
        };
        assert!(matches!(err, LeagueError::NoCompletedRound));

        let _ = open_overdue_round(&fix.store, 1).await;
        let Ok(Some(outcome)) = fix.lifecycle.close_if_due(CloseTrigger::Admin).await else {
            panic!("close failed");
        };
        let Ok(seeded) = fix.lifecycle.seed_role_recipients(&[UserId::new(9)]).await else {
            panic!("seed failed");
        };
        assert_eq!(seeded.round_id, outcome.plan.round.round_id);
        let Ok(recipients) = fix.store.role_recipients(seeded.round_id).await else {
            panic!("recipients failed");
        };
        assert!(recipients.contains(&UserId::new(9)));
    }
}
