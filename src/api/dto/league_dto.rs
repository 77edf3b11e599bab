//! DTOs for membership, ingestion, standings, and stats endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::RankedEntry;

/// `POST /league/join` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Platform id of the joining user.
    pub user_id: i64,
    /// Display name to show on boards.
    pub username: String,
    /// Compete on the Spanish board.
    #[serde(default)]
    pub learning_spanish: bool,
    /// Compete on the English board.
    #[serde(default)]
    pub learning_english: bool,
}

/// `POST /league/join` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Platform id of the joined user.
    pub user_id: i64,
    /// Board the user competes on (`spanish` or `english`).
    pub board: String,
}

/// `POST /league/leave` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveRequest {
    /// Platform id of the leaving user.
    pub user_id: i64,
}

/// `POST /league/leave` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveResponse {
    /// Platform id of the user.
    pub user_id: i64,
    /// Whether the user was actually a member.
    pub removed: bool,
}

/// Query parameters for `GET /league/leaderboard`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BoardQuery {
    /// Board to rank: `spanish`, `english`, or `combined`. Defaults to
    /// `combined`.
    #[serde(default = "default_board")]
    pub board: String,
    /// Rows to return (1–25). Defaults to 10.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_board() -> String {
    "combined".to_string()
}

const fn default_limit() -> u32 {
    10
}

/// One ranked leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankedEntryDto {
    /// 1-based competition rank.
    pub rank: u32,
    /// Participant id.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Points plus active-day bonus.
    pub total_score: i64,
    /// Distinct active days.
    pub active_days: i64,
}

impl From<RankedEntry> for RankedEntryDto {
    fn from(entry: RankedEntry) -> Self {
        Self {
            rank: entry.rank,
            user_id: entry.user_id.get(),
            username: entry.username,
            total_score: entry.total_score,
            active_days: entry.active_days,
        }
    }
}

/// `GET /league/leaderboard` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Board the entries belong to.
    pub board: String,
    /// Ranked rows, best first.
    pub entries: Vec<RankedEntryDto>,
}

/// `GET /league/users/{id}/stats` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserStatsResponse {
    /// Display name.
    pub username: String,
    /// Points earned this round.
    pub total_points: i64,
    /// Distinct active days this round.
    pub active_days: i64,
    /// Points plus active-day bonus.
    pub total_score: i64,
    /// Rank on the Spanish board, when competing there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_spanish: Option<u32>,
    /// Rank on the English board, when competing there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_english: Option<u32>,
    /// Rank on the combined board.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_combined: Option<u32>,
}

/// `POST /events` request body: one inbound message from the event source.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngestEventRequest {
    /// Sender id.
    pub user_id: i64,
    /// Channel the message arrived in.
    pub channel_id: i64,
    /// Space the channel belongs to; omit for direct messages.
    pub guild_id: Option<i64>,
    /// Raw text content.
    pub content: String,
    /// Upstream message id.
    pub source_event_id: Option<i64>,
    /// Delivery time; defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether the sender is a bot or system account.
    #[serde(default)]
    pub from_bot: bool,
}

/// `POST /events` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestEventResponse {
    /// Whether the event counted toward the league.
    pub counted: bool,
    /// Rejection reason when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}
