//! Row models for league storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BoardType, ChannelId, RoundId, UserId};

/// A league participant row.
///
/// Created on first join and never deleted; leaving only flips `opted_in`
/// so historical activity stays attributable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeagueUser {
    /// Platform id of the participant.
    pub user_id: UserId,
    /// Display name captured at join time (refreshed on re-join).
    pub username: String,
    /// Whether the user currently participates.
    pub opted_in: bool,
    /// Whether an admin has banned the user from scoring.
    pub banned: bool,
    /// Learning-Spanish flag; gates the Spanish board.
    pub learning_spanish: bool,
    /// Learning-English flag; gates the English board.
    pub learning_english: bool,
    /// First join time.
    pub joined_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    /// Currently accumulating activity.
    Active,
    /// Closed; terminal for this round instance.
    Completed,
}

impl RoundStatus {
    /// Stable storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Parses the stable storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A scoring round.
///
/// At most one round is ACTIVE at any committed instant; the store enforces
/// this with a partial unique index and a conditional status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    /// Round identity.
    pub round_id: RoundId,
    /// Monotonically increasing number, starting at 1.
    pub round_number: i64,
    /// Opening instant.
    pub start_time: DateTime<Utc>,
    /// Scheduled closing boundary (Sunday 12:00 UTC).
    pub end_time: DateTime<Utc>,
    /// Lifecycle state.
    pub status: RoundStatus,
}

/// An append-only qualifying activity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    /// Participant that produced the event.
    pub user_id: UserId,
    /// Round the event counts toward.
    pub round_id: RoundId,
    /// Channel the event arrived in.
    pub channel_id: ChannelId,
    /// Points awarded (fixed positive constant).
    pub points: i64,
    /// Upstream message id, when the source provided one.
    pub source_event_id: Option<i64>,
    /// Event time.
    pub created_at: DateTime<Utc>,
}

/// Immutable winner snapshot written once at round close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundWinner {
    /// Closed round.
    pub round_id: RoundId,
    /// Winning participant.
    pub user_id: UserId,
    /// Language board the rank was earned on.
    pub league: BoardType,
    /// Final rank (1..=3).
    pub rank: i32,
    /// Final total score.
    pub total_score: i64,
    /// Active days in the round.
    pub active_days: i64,
}

/// A channel on the exclusion list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ExcludedChannel {
    /// Excluded channel id.
    pub channel_id: ChannelId,
    /// Channel name at exclusion time, if known.
    pub channel_name: Option<String>,
    /// Admin who excluded it.
    pub added_by: UserId,
    /// Exclusion time.
    pub added_at: DateTime<Utc>,
}

/// Read-only aggregate for the admin overview command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueOverview {
    /// Opted-in, non-banned participants.
    pub total_users: i64,
    /// Participants on the Spanish board.
    pub spanish_learners: i64,
    /// Participants on the English board.
    pub english_learners: i64,
    /// Banned participants.
    pub banned_users: i64,
    /// Counted events in the current round.
    pub events_this_round: i64,
    /// Channels currently excluded.
    pub excluded_channels: i64,
}
