//! DTOs for the admin endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::league_dto::RankedEntryDto;
use crate::store::models::{ExcludedChannel, LeagueOverview, RoundWinner};

/// Response for ban/unban toggles.
#[derive(Debug, Serialize, ToSchema)]
pub struct BanResponse {
    /// Target user.
    pub user_id: i64,
    /// Ban state after the command.
    pub banned: bool,
    /// Whether the user existed at all.
    pub known_user: bool,
}

/// `POST /admin/channels/exclude` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExcludeChannelRequest {
    /// Channel to exclude from tracking.
    pub channel_id: i64,
    /// Channel name, for the listing.
    pub channel_name: Option<String>,
    /// Admin issuing the command.
    pub admin_id: i64,
}

/// One excluded channel in the listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExcludedChannelDto {
    /// Channel id.
    pub channel_id: i64,
    /// Channel name at exclusion time.
    pub channel_name: Option<String>,
    /// Admin who excluded it.
    pub added_by: i64,
    /// Exclusion time.
    pub added_at: DateTime<Utc>,
}

impl From<ExcludedChannel> for ExcludedChannelDto {
    fn from(ch: ExcludedChannel) -> Self {
        Self {
            channel_id: ch.channel_id.get(),
            channel_name: ch.channel_name,
            added_by: ch.added_by.get(),
            added_at: ch.added_at,
        }
    }
}

/// One persisted winner snapshot row.
#[derive(Debug, Serialize, ToSchema)]
pub struct WinnerDto {
    /// Winning participant.
    pub user_id: i64,
    /// Board the rank was earned on.
    pub league: String,
    /// Final rank (1..=3).
    pub rank: i32,
    /// Final total score.
    pub total_score: i64,
    /// Active days in the round.
    pub active_days: i64,
}

impl From<RoundWinner> for WinnerDto {
    fn from(w: RoundWinner) -> Self {
        Self {
            user_id: w.user_id.get(),
            league: w.league.as_str().to_string(),
            rank: w.rank,
            total_score: w.total_score,
            active_days: w.active_days,
        }
    }
}

/// `POST /admin/rounds/end` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndRoundResponse {
    /// Number of the round that was closed.
    pub closed_round_number: i64,
    /// Number of the newly opened round.
    pub next_round_number: i64,
    /// Scheduled end of the new round.
    pub next_round_end: DateTime<Utc>,
    /// Persisted winner snapshots.
    pub winners: Vec<WinnerDto>,
    /// Users granted champion status.
    pub champions: Vec<RankedEntryDto>,
    /// Users resting this round (last round's champions).
    pub resting: Vec<i64>,
}

/// `GET /admin/rounds/preview` response: the close computation with no
/// mutation.
#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewResponse {
    /// Round that would be closed.
    pub round_number: i64,
    /// Winner snapshots that would be persisted.
    pub winners: Vec<WinnerDto>,
    /// Users that would be granted champion status.
    pub champions: Vec<RankedEntryDto>,
    /// Users that would be resting.
    pub resting: Vec<i64>,
}

/// `POST /admin/recipients/seed` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SeedRecipientsRequest {
    /// Users to record as champion holders of the last completed round.
    pub user_ids: Vec<i64>,
}

/// `POST /admin/recipients/seed` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SeedRecipientsResponse {
    /// Round the recipients were attached to.
    pub round_number: i64,
    /// How many users were seeded.
    pub seeded: usize,
}

/// `GET /admin/overview` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct OverviewResponse {
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

impl From<LeagueOverview> for OverviewResponse {
    fn from(o: LeagueOverview) -> Self {
        Self {
            total_users: o.total_users,
            spanish_learners: o.spanish_learners,
            english_learners: o.english_learners,
            banned_users: o.banned_users,
            events_this_round: o.events_this_round,
            excluded_channels: o.excluded_channels,
        }
    }
}
