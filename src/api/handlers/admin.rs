//! Admin handlers: bans, channel exclusion, round control, seeding.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BanResponse, EndRoundResponse, ExcludeChannelRequest, ExcludedChannelDto, OverviewResponse,
    PreviewResponse, RankedEntryDto, SeedRecipientsRequest, SeedRecipientsResponse, WinnerDto,
};
use crate::app_state::AppState;
use crate::domain::{ChannelId, UserId};
use crate::error::{ErrorResponse, LeagueError};
use crate::service::{ClosePlan, CloseTrigger};

fn sorted_resting(plan: &ClosePlan) -> Vec<i64> {
    let mut resting: Vec<i64> = plan.cooldown.iter().map(|u| u.get()).collect();
    resting.sort_unstable();
    resting
}

/// `POST /admin/users/{id}/ban` — Ban a user from scoring.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/ban",
    tag = "Admin",
    summary = "Ban a user",
    params(("id" = i64, Path, description = "Platform user id")),
    responses(
        (status = 200, description = "Ban processed", body = BanResponse),
    )
)]
pub async fn ban_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, LeagueError> {
    let known_user = state.league.ban(UserId::new(id)).await?;
    Ok(Json(BanResponse {
        user_id: id,
        banned: true,
        known_user,
    }))
}

/// `POST /admin/users/{id}/unban` — Lift a ban.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/unban",
    tag = "Admin",
    summary = "Unban a user",
    params(("id" = i64, Path, description = "Platform user id")),
    responses(
        (status = 200, description = "Unban processed", body = BanResponse),
    )
)]
pub async fn unban_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, LeagueError> {
    let known_user = state.league.unban(UserId::new(id)).await?;
    Ok(Json(BanResponse {
        user_id: id,
        banned: false,
        known_user,
    }))
}

/// `POST /admin/channels/exclude` — Exclude a channel from tracking.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/channels/exclude",
    tag = "Admin",
    summary = "Exclude a channel",
    request_body = ExcludeChannelRequest,
    responses(
        (status = 200, description = "Channel excluded"),
    )
)]
pub async fn exclude_channel(
    State(state): State<AppState>,
    Json(req): Json<ExcludeChannelRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    state
        .league
        .exclude_channel(
            ChannelId::new(req.channel_id),
            req.channel_name.as_deref(),
            UserId::new(req.admin_id),
        )
        .await?;
    Ok(Json(serde_json::json!({ "channel_id": req.channel_id, "excluded": true })))
}

/// `POST /admin/channels/{id}/include` — Re-include an excluded channel.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/channels/{id}/include",
    tag = "Admin",
    summary = "Re-include a channel",
    params(("id" = i64, Path, description = "Channel id")),
    responses(
        (status = 200, description = "Include processed"),
    )
)]
pub async fn include_channel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, LeagueError> {
    let removed = state.league.include_channel(ChannelId::new(id)).await?;
    Ok(Json(serde_json::json!({ "channel_id": id, "was_excluded": removed })))
}

/// `GET /admin/channels/excluded` — List excluded channels.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/admin/channels/excluded",
    tag = "Admin",
    summary = "List excluded channels",
    responses(
        (status = 200, description = "Exclusion list", body = Vec<ExcludedChannelDto>),
    )
)]
pub async fn excluded_channels(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LeagueError> {
    let channels = state.league.excluded_channels().await?;
    let channels: Vec<ExcludedChannelDto> =
        channels.into_iter().map(ExcludedChannelDto::from).collect();
    Ok(Json(channels))
}

/// `POST /admin/rounds/end` — Close the active round now.
///
/// # Errors
///
/// Returns [`LeagueError::NoActiveRound`] when there is nothing to close
/// (including losing the race against a concurrent close).
#[utoipa::path(
    post,
    path = "/api/v1/admin/rounds/end",
    tag = "Admin",
    summary = "End the current round",
    description = "Runs the same close sequence as the scheduler, unconditionally. Winners are persisted, champions rotated with the cooldown applied, and the next round opened.",
    responses(
        (status = 200, description = "Round closed", body = EndRoundResponse),
        (status = 409, description = "No active round", body = ErrorResponse),
    )
)]
pub async fn end_round(State(state): State<AppState>) -> Result<impl IntoResponse, LeagueError> {
    let outcome = state
        .lifecycle
        .close_if_due(CloseTrigger::Admin)
        .await?
        .ok_or(LeagueError::NoActiveRound)?;

    let resting = sorted_resting(&outcome.plan);
    Ok(Json(EndRoundResponse {
        closed_round_number: outcome.plan.round.round_number,
        next_round_number: outcome.next.round_number,
        next_round_end: outcome.next.end_time,
        winners: outcome.plan.winners.into_iter().map(WinnerDto::from).collect(),
        champions: outcome
            .plan
            .champions
            .into_iter()
            .map(RankedEntryDto::from)
            .collect(),
        resting,
    }))
}

/// `GET /admin/rounds/preview` — Dry-run the close computation.
///
/// # Errors
///
/// Returns [`LeagueError::NoActiveRound`] when nothing is open.
#[utoipa::path(
    get,
    path = "/api/v1/admin/rounds/preview",
    tag = "Admin",
    summary = "Preview the round close",
    description = "Shows the winners, champions, and cooldown set the close would commit, without mutating anything.",
    responses(
        (status = 200, description = "Close preview", body = PreviewResponse),
        (status = 409, description = "No active round", body = ErrorResponse),
    )
)]
pub async fn preview_round(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LeagueError> {
    let plan = state.lifecycle.preview().await?;
    let resting = sorted_resting(&plan);
    Ok(Json(PreviewResponse {
        round_number: plan.round.round_number,
        winners: plan.winners.into_iter().map(WinnerDto::from).collect(),
        champions: plan.champions.into_iter().map(RankedEntryDto::from).collect(),
        resting,
    }))
}

/// `POST /admin/recipients/seed` — Seed champion holders for the last
/// completed round (migration utility).
///
/// # Errors
///
/// Returns [`LeagueError::NoCompletedRound`] when no round has completed.
#[utoipa::path(
    post,
    path = "/api/v1/admin/recipients/seed",
    tag = "Admin",
    summary = "Seed role recipients",
    request_body = SeedRecipientsRequest,
    responses(
        (status = 200, description = "Recipients seeded", body = SeedRecipientsResponse),
        (status = 409, description = "No completed round", body = ErrorResponse),
    )
)]
pub async fn seed_recipients(
    State(state): State<AppState>,
    Json(req): Json<SeedRecipientsRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let users: Vec<UserId> = req.user_ids.iter().copied().map(UserId::new).collect();
    let round = state.lifecycle.seed_role_recipients(&users).await?;
    Ok(Json(SeedRecipientsResponse {
        round_number: round.round_number,
        seeded: users.len(),
    }))
}

/// `GET /admin/overview` — League-wide counters.
///
/// # Errors
///
/// Returns [`LeagueError::NoActiveRound`] when nothing is open.
#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    tag = "Admin",
    summary = "Admin overview",
    responses(
        (status = 200, description = "League counters", body = OverviewResponse),
        (status = 409, description = "No active round", body = ErrorResponse),
    )
)]
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, LeagueError> {
    let overview = state.league.overview().await?;
    Ok(Json(OverviewResponse::from(overview)))
}

/// Admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/{id}/ban", post(ban_user))
        .route("/admin/users/{id}/unban", post(unban_user))
        .route("/admin/channels/exclude", post(exclude_channel))
        .route("/admin/channels/{id}/include", post(include_channel))
        .route("/admin/channels/excluded", get(excluded_channels))
        .route("/admin/rounds/end", post(end_round))
        .route("/admin/rounds/preview", get(preview_round))
        .route("/admin/recipients/seed", post(seed_recipients))
        .route("/admin/overview", get(overview))
}
