//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1`; with the `swagger-ui`
//! feature enabled the OpenAPI document is served at
//! `/api-docs/openapi.json` with a browser UI at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// OpenAPI document for the league command surface.
#[cfg(feature = "swagger-ui")]
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        handlers::league::join,
        handlers::league::leave,
        handlers::league::leaderboard,
        handlers::league::user_stats,
        handlers::league::ingest_event,
        handlers::admin::ban_user,
        handlers::admin::unban_user,
        handlers::admin::exclude_channel,
        handlers::admin::include_channel,
        handlers::admin::excluded_channels,
        handlers::admin::end_round,
        handlers::admin::preview_round,
        handlers::admin::seed_recipients,
        handlers::admin::overview,
        handlers::system::health_handler,
    ),
    tags(
        (name = "League", description = "Membership, ingestion, and standings"),
        (name = "Admin", description = "Moderation and round control"),
        (name = "System", description = "Service health"),
    )
)]
struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi as _;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    };

    router
}
