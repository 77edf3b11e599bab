//! Membership, ingestion, standings, and stats handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    BoardQuery, IngestEventRequest, IngestEventResponse, JoinRequest, JoinResponse,
    LeaderboardResponse, LeaveRequest, LeaveResponse, RankedEntryDto, UserStatsResponse,
};
use crate::app_state::AppState;
use crate::domain::{BoardType, ChannelId, UserId};
use crate::error::{ErrorResponse, LeagueError};
use crate::service::{GateDecision, InboundEvent};

/// `POST /league/join` — Opt into the league.
///
/// # Errors
///
/// Returns [`LeagueError::InvalidRequest`] unless exactly one learning
/// language is selected.
#[utoipa::path(
    post,
    path = "/api/v1/league/join",
    tag = "League",
    summary = "Join the league",
    description = "Opts a user in. Re-joining refreshes the username and learning flags. Exactly one learning language must be selected.",
    request_body = JoinRequest,
    responses(
        (status = 201, description = "User joined", body = JoinResponse),
        (status = 400, description = "Invalid learning-language selection", body = ErrorResponse),
    )
)]
pub async fn join(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    state
        .league
        .join(
            UserId::new(req.user_id),
            &req.username,
            req.learning_spanish,
            req.learning_english,
        )
        .await?;

    let board = if req.learning_spanish {
        BoardType::Spanish
    } else {
        BoardType::English
    };
    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            user_id: req.user_id,
            board: board.as_str().to_string(),
        }),
    ))
}

/// `POST /league/leave` — Opt out of the league.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures.
#[utoipa::path(
    post,
    path = "/api/v1/league/leave",
    tag = "League",
    summary = "Leave the league",
    description = "Opts a user out. History is preserved; the user simply stops appearing on boards.",
    request_body = LeaveRequest,
    responses(
        (status = 200, description = "Leave processed", body = LeaveResponse),
    )
)]
pub async fn leave(
    State(state): State<AppState>,
    Json(req): Json<LeaveRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let removed = state.league.leave(UserId::new(req.user_id)).await?;
    Ok(Json(LeaveResponse {
        user_id: req.user_id,
        removed,
    }))
}

/// `GET /league/leaderboard` — Ranked standings for a board.
///
/// # Errors
///
/// Returns [`LeagueError::InvalidRequest`] for an unknown board or an
/// out-of-range limit.
#[utoipa::path(
    get,
    path = "/api/v1/league/leaderboard",
    tag = "League",
    summary = "Get a leaderboard",
    description = "Returns ranked standings for the requested board in the current round, served from a short-TTL cache.",
    params(BoardQuery),
    responses(
        (status = 200, description = "Ranked standings", body = LeaderboardResponse),
        (status = 400, description = "Unknown board or bad limit", body = ErrorResponse),
        (status = 409, description = "No active round", body = ErrorResponse),
    )
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, LeagueError> {
    let board = BoardType::parse(&query.board)
        .ok_or_else(|| LeagueError::InvalidRequest(format!("unknown board: {}", query.board)))?;

    let entries = state.league.get_leaderboard(board, query.limit).await?;
    Ok(Json(LeaderboardResponse {
        board: board.as_str().to_string(),
        entries: entries.into_iter().map(RankedEntryDto::from).collect(),
    }))
}

/// `GET /league/users/{id}/stats` — Per-user stats for the current round.
///
/// # Errors
///
/// Returns [`LeagueError::UserNotFound`] for unknown, opted-out, or banned
/// users.
#[utoipa::path(
    get,
    path = "/api/v1/league/users/{id}/stats",
    tag = "League",
    summary = "Get user stats",
    description = "Returns points, active days, total score, and per-board ranks for one participant.",
    params(
        ("id" = i64, Path, description = "Platform user id"),
    ),
    responses(
        (status = 200, description = "User stats", body = UserStatsResponse),
        (status = 404, description = "User not in the league", body = ErrorResponse),
    )
)]
pub async fn user_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, LeagueError> {
    let stats = state.league.user_stats(UserId::new(id)).await?;
    Ok(Json(UserStatsResponse {
        username: stats.username,
        total_points: stats.total_points,
        active_days: stats.active_days,
        total_score: stats.total_score,
        rank_spanish: stats.rank_spanish,
        rank_english: stats.rank_english,
        rank_combined: stats.rank_combined,
    }))
}

/// `POST /events` — Ingest one inbound message from the event source.
///
/// # Errors
///
/// Returns [`LeagueError`] on store failures; policy rejections are a
/// successful response with `counted = false`.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "League",
    summary = "Ingest an activity event",
    description = "Runs one inbound message through the eligibility gate. Rejected events are dropped silently and never retried.",
    request_body = IngestEventRequest,
    responses(
        (status = 202, description = "Event processed", body = IngestEventResponse),
    )
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(req): Json<IngestEventRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let event = InboundEvent {
        user_id: UserId::new(req.user_id),
        channel_id: ChannelId::new(req.channel_id),
        guild_id: req.guild_id,
        content: req.content,
        source_event_id: req.source_event_id,
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
        from_bot: req.from_bot,
    };

    let decision = state.league.handle_event(event).await?;
    let response = match decision {
        GateDecision::Accepted => IngestEventResponse {
            counted: true,
            reject_reason: None,
        },
        GateDecision::Rejected(reason) => IngestEventResponse {
            counted: false,
            reject_reason: Some(reason.as_str().to_string()),
        },
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// League routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/league/join", post(join))
        .route("/league/leave", post(leave))
        .route("/league/leaderboard", get(leaderboard))
        .route("/league/users/{id}/stats", get(user_stats))
        .route("/events", post(ingest_event))
}
