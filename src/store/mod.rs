//! Storage layer: the [`LeagueStore`] collaborator interface and its
//! PostgreSQL and in-memory implementations.
//!
//! The engine treats durable storage as an external collaborator, so every
//! service talks to this trait rather than to a concrete database. The
//! production binary wires [`PostgresStore`]; tests and local runs use
//! [`MemoryStore`], which implements the same conditional-update semantics
//! for round transitions.

pub mod memory;
pub mod models;
pub mod postgres;

use chrono::{DateTime, Utc};

use crate::domain::{ActivityTotals, BoardType, ChannelId, RoundId, UserId};
use crate::error::LeagueError;

pub use memory::MemoryStore;
pub use models::{
    ActivityEvent, ExcludedChannel, LeagueOverview, LeagueUser, Round, RoundStatus, RoundWinner,
};
pub use postgres::PostgresStore;

/// Async CRUD and aggregate queries over league state.
///
/// All methods are cancel-safe single round trips except
/// [`finalize_round`](LeagueStore::finalize_round), which runs one
/// transaction with a conditional status update so that concurrent closers
/// cannot both commit.
#[async_trait::async_trait]
pub trait LeagueStore: Send + Sync + std::fmt::Debug {
    // ── Members ─────────────────────────────────────────────────────────

    /// Inserts or re-activates a participant, refreshing username and flags.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn upsert_member(
        &self,
        user_id: UserId,
        username: &str,
        learning_spanish: bool,
        learning_english: bool,
    ) -> Result<(), LeagueError>;

    /// Flips `opted_in` off. Returns `false` when the user never joined.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn opt_out(&self, user_id: UserId) -> Result<bool, LeagueError>;

    /// Sets the banned flag. Returns `false` when the user never joined.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool, LeagueError>;

    /// Fetches a participant row.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn member(&self, user_id: UserId) -> Result<Option<LeagueUser>, LeagueError>;

    // ── Excluded channels ───────────────────────────────────────────────

    /// Adds (or refreshes) a channel on the exclusion list.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn exclude_channel(
        &self,
        channel_id: ChannelId,
        channel_name: Option<&str>,
        added_by: UserId,
    ) -> Result<(), LeagueError>;

    /// Removes a channel from the exclusion list. Returns `false` when the
    /// channel was not excluded.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn include_channel(&self, channel_id: ChannelId) -> Result<bool, LeagueError>;

    /// Membership test against the exclusion list.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn is_channel_excluded(&self, channel_id: ChannelId) -> Result<bool, LeagueError>;

    /// Lists the exclusion list, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn excluded_channels(&self) -> Result<Vec<ExcludedChannel>, LeagueError>;

    // ── Rounds ──────────────────────────────────────────────────────────

    /// Returns the single ACTIVE round, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn active_round(&self) -> Result<Option<Round>, LeagueError>;

    /// Inserts a new round row (startup bootstrap only; round close creates
    /// its successor inside [`finalize_round`](LeagueStore::finalize_round)).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn open_round(&self, round: &Round) -> Result<(), LeagueError>;

    /// Most recently COMPLETED round with a number strictly below
    /// `round_number`.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn completed_round_before(
        &self,
        round_number: i64,
    ) -> Result<Option<Round>, LeagueError>;

    /// Most recently COMPLETED round overall.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn latest_completed_round(&self) -> Result<Option<Round>, LeagueError>;

    /// Atomically closes `round_id` and opens `next`.
    ///
    /// In one transaction: marks the round COMPLETED only if still ACTIVE,
    /// persists `winners` and `recipients`, and inserts the next round.
    /// Returns `false` (with nothing committed) when the conditional update
    /// matched no row, i.e. a concurrent close already won.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure; the transaction
    /// is rolled back and the round stays ACTIVE.
    async fn finalize_round(
        &self,
        round_id: RoundId,
        winners: &[RoundWinner],
        recipients: &[UserId],
        next: &Round,
    ) -> Result<bool, LeagueError>;

    // ── Activity ────────────────────────────────────────────────────────

    /// Appends one activity event. Never mutates existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure; the event is not
    /// recorded.
    async fn record_event(&self, event: &ActivityEvent) -> Result<(), LeagueError>;

    /// Number of events counted for `user_id` since `since`.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn daily_event_count(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, LeagueError>;

    /// Per-participant points and distinct active days for a board within a
    /// round. Includes opted-in, non-banned participants with zero activity.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn board_totals(
        &self,
        round_id: RoundId,
        board: BoardType,
    ) -> Result<Vec<ActivityTotals>, LeagueError>;

    /// `(points, active_days)` for one participant within a round.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn member_totals(
        &self,
        user_id: UserId,
        round_id: RoundId,
    ) -> Result<(i64, i64), LeagueError>;

    // ── Role recipients ─────────────────────────────────────────────────

    /// Users who held champion status for `round_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn role_recipients(&self, round_id: RoundId) -> Result<Vec<UserId>, LeagueError>;

    /// Records champion holders for `round_id` outside a close transaction
    /// (the seed/migration path). Duplicate pairs are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn add_role_recipients(
        &self,
        round_id: RoundId,
        users: &[UserId],
    ) -> Result<(), LeagueError>;

    // ── Aggregates ──────────────────────────────────────────────────────

    /// Admin overview counters for the current round.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Store`] on backend failure.
    async fn overview(&self, round_id: RoundId) -> Result<LeagueOverview, LeagueError>;
}
