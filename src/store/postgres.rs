//! PostgreSQL implementation of the league store.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::LeagueStore;
use super::models::{
    ActivityEvent, ExcludedChannel, LeagueOverview, LeagueUser, Round, RoundStatus, RoundWinner,
};
use crate::config::LeagueConfig;
use crate::domain::{ActivityTotals, BoardType, ChannelId, RoundId, UserId};
use crate::error::LeagueError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Board-specific filter fragment for ranking queries.
///
/// The fragment is selected from a fixed enum match, never interpolated
/// from caller input.
const fn board_filter(board: BoardType) -> &'static str {
    match board {
        BoardType::Spanish => "u.learning_spanish = TRUE",
        BoardType::English => "u.learning_english = TRUE",
        BoardType::Combined => "TRUE",
    }
}

impl PostgresStore {
    /// Creates a store from an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL using the given configuration and applies
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Store`] when the pool cannot be built or a
    /// migration fails.
    pub async fn connect(config: &LeagueConfig) -> Result<Self, LeagueError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| LeagueError::Store(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn round_from_row(
        row: (uuid::Uuid, i64, DateTime<Utc>, DateTime<Utc>, String),
    ) -> Result<Round, LeagueError> {
        let (round_id, round_number, start_time, end_time, status) = row;
        let status = RoundStatus::parse(&status)
            .ok_or_else(|| LeagueError::Store(format!("unknown round status: {status}")))?;
        Ok(Round {
            round_id: RoundId::from_uuid(round_id),
            round_number,
            start_time,
            end_time,
            status,
        })
    }
}

#[async_trait::async_trait]
impl LeagueStore for PostgresStore {
    async fn upsert_member(
        &self,
        user_id: UserId,
        username: &str,
        learning_spanish: bool,
        learning_english: bool,
    ) -> Result<(), LeagueError> {
        sqlx::query(
            "INSERT INTO league_users \
             (user_id, username, opted_in, learning_spanish, learning_english) \
             VALUES ($1, $2, TRUE, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE \
             SET opted_in = TRUE, username = $2, learning_spanish = $3, \
                 learning_english = $4, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(username)
        .bind(learning_spanish)
        .bind(learning_english)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn opt_out(&self, user_id: UserId) -> Result<bool, LeagueError> {
        let result = sqlx::query(
            "UPDATE league_users SET opted_in = FALSE, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool, LeagueError> {
        let result = sqlx::query(
            "UPDATE league_users SET banned = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(banned)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn member(&self, user_id: UserId) -> Result<Option<LeagueUser>, LeagueError> {
        let row = sqlx::query_as::<_, LeagueUser>(
            "SELECT user_id, username, opted_in, banned, learning_spanish, \
                    learning_english, joined_at, updated_at \
             FROM league_users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn exclude_channel(
        &self,
        channel_id: ChannelId,
        channel_name: Option<&str>,
        added_by: UserId,
    ) -> Result<(), LeagueError> {
        sqlx::query(
            "INSERT INTO league_excluded_channels (channel_id, channel_name, added_by) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (channel_id) DO UPDATE \
             SET channel_name = $2, added_by = $3, added_at = NOW()",
        )
        .bind(channel_id)
        .bind(channel_name)
        .bind(added_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn include_channel(&self, channel_id: ChannelId) -> Result<bool, LeagueError> {
        let result = sqlx::query("DELETE FROM league_excluded_channels WHERE channel_id = $1")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_channel_excluded(&self, channel_id: ChannelId) -> Result<bool, LeagueError> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT channel_id FROM league_excluded_channels WHERE channel_id = $1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn excluded_channels(&self) -> Result<Vec<ExcludedChannel>, LeagueError> {
        let rows = sqlx::query_as::<_, ExcludedChannel>(
            "SELECT channel_id, channel_name, added_by, added_at \
             FROM league_excluded_channels ORDER BY added_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn active_round(&self) -> Result<Option<Round>, LeagueError> {
        let row = sqlx::query_as::<_, (uuid::Uuid, i64, DateTime<Utc>, DateTime<Utc>, String)>(
            "SELECT round_id, round_number, start_time, end_time, status \
             FROM league_rounds WHERE status = 'active'",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::round_from_row).transpose()
    }

    async fn open_round(&self, round: &Round) -> Result<(), LeagueError> {
        sqlx::query(
            "INSERT INTO league_rounds (round_id, round_number, start_time, end_time, status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(round.round_id)
        .bind(round.round_number)
        .bind(round.start_time)
        .bind(round.end_time)
        .bind(round.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn completed_round_before(
        &self,
        round_number: i64,
    ) -> Result<Option<Round>, LeagueError> {
        let row = sqlx::query_as::<_, (uuid::Uuid, i64, DateTime<Utc>, DateTime<Utc>, String)>(
            "SELECT round_id, round_number, start_time, end_time, status \
             FROM league_rounds \
             WHERE status = 'completed' AND round_number < $1 \
             ORDER BY round_number DESC LIMIT 1",
        )
        .bind(round_number)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::round_from_row).transpose()
    }

    async fn latest_completed_round(&self) -> Result<Option<Round>, LeagueError> {
        let row = sqlx::query_as::<_, (uuid::Uuid, i64, DateTime<Utc>, DateTime<Utc>, String)>(
            "SELECT round_id, round_number, start_time, end_time, status \
             FROM league_rounds WHERE status = 'completed' \
             ORDER BY round_number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::round_from_row).transpose()
    }

    async fn finalize_round(
        &self,
        round_id: RoundId,
        winners: &[RoundWinner],
        recipients: &[UserId],
        next: &Round,
    ) -> Result<bool, LeagueError> {
        let mut tx = self.pool.begin().await?;

        // Conditional transition: only the first closer matches a row.
        let updated = sqlx::query(
            "UPDATE league_rounds SET status = 'completed' \
             WHERE round_id = $1 AND status = 'active'",
        )
        .bind(round_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for winner in winners {
            sqlx::query(
                "INSERT INTO league_round_winners \
                 (round_id, user_id, league, rank, total_score, active_days) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(winner.round_id)
            .bind(winner.user_id)
            .bind(winner.league.as_str())
            .bind(winner.rank)
            .bind(winner.total_score)
            .bind(winner.active_days)
            .execute(&mut *tx)
            .await?;
        }

        for user_id in recipients {
            sqlx::query(
                "INSERT INTO league_role_recipients (round_id, user_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(round_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO league_rounds (round_id, round_number, start_time, end_time, status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(next.round_id)
        .bind(next.round_number)
        .bind(next.start_time)
        .bind(next.end_time)
        .bind(next.status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn record_event(&self, event: &ActivityEvent) -> Result<(), LeagueError> {
        sqlx::query(
            "INSERT INTO league_activity \
             (user_id, round_id, channel_id, points, source_event_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.user_id)
        .bind(event.round_id)
        .bind(event.channel_id)
        .bind(event.points)
        .bind(event.source_event_id)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn daily_event_count(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, LeagueError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM league_activity WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn board_totals(
        &self,
        round_id: RoundId,
        board: BoardType,
    ) -> Result<Vec<ActivityTotals>, LeagueError> {
        let sql = format!(
            "SELECT u.user_id, u.username, \
                    COALESCE(SUM(a.points), 0)::BIGINT AS points, \
                    COUNT(DISTINCT (a.created_at AT TIME ZONE 'UTC')::date)::BIGINT AS active_days \
             FROM league_users u \
             LEFT JOIN league_activity a \
                 ON a.user_id = u.user_id AND a.round_id = $1 \
             WHERE u.opted_in = TRUE AND u.banned = FALSE AND {} \
             GROUP BY u.user_id, u.username",
            board_filter(board)
        );

        let rows = sqlx::query_as::<_, (UserId, String, i64, i64)>(&sql)
            .bind(round_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, points, active_days)| ActivityTotals {
                user_id,
                username,
                points,
                active_days,
            })
            .collect())
    }

    async fn member_totals(
        &self,
        user_id: UserId,
        round_id: RoundId,
    ) -> Result<(i64, i64), LeagueError> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COALESCE(SUM(points), 0)::BIGINT, \
                    COUNT(DISTINCT (created_at AT TIME ZONE 'UTC')::date)::BIGINT \
             FROM league_activity WHERE user_id = $1 AND round_id = $2",
        )
        .bind(user_id)
        .bind(round_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn role_recipients(&self, round_id: RoundId) -> Result<Vec<UserId>, LeagueError> {
        let rows = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM league_role_recipients WHERE round_id = $1 ORDER BY user_id",
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn add_role_recipients(
        &self,
        round_id: RoundId,
        users: &[UserId],
    ) -> Result<(), LeagueError> {
        for user_id in users {
            sqlx::query(
                "INSERT INTO league_role_recipients (round_id, user_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(round_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn overview(&self, round_id: RoundId) -> Result<LeagueOverview, LeagueError> {
        let (total_users, spanish_learners, english_learners, banned_users) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                "SELECT COUNT(*) FILTER (WHERE opted_in AND NOT banned), \
                        COUNT(*) FILTER (WHERE opted_in AND NOT banned AND learning_spanish), \
                        COUNT(*) FILTER (WHERE opted_in AND NOT banned AND learning_english), \
                        COUNT(*) FILTER (WHERE banned) \
                 FROM league_users",
            )
            .fetch_one(&self.pool)
            .await?;

        let events_this_round = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM league_activity WHERE round_id = $1",
        )
        .bind(round_id)
        .fetch_one(&self.pool)
        .await?;

        let excluded_channels =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM league_excluded_channels")
                .fetch_one(&self.pool)
                .await?;

        Ok(LeagueOverview {
            total_users,
            spanish_learners,
            english_learners,
            banned_users,
            events_this_round,
            excluded_channels,
        })
    }
}
