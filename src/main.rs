//! league-engine server entry point.
//!
//! Wires the store, collaborators, services, and background tasks, then
//! serves the REST command surface until interrupted.

use std::sync::Arc;

use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use league_engine::api;
use league_engine::app_state::AppState;
use league_engine::config::LeagueConfig;
use league_engine::domain::{ChannelId, CooldownTracker, LeaderboardCache};
use league_engine::external::{
    DisabledDetector, LanguageDetector, LoggingNotifier, LoggingRoleApi, NotificationSink, RoleApi,
};
use league_engine::scheduler::{spawn_cooldown_sweeper, spawn_round_ticker};
use league_engine::service::{
    ActivityGate, ActivityRecorder, LeagueService, LeaderboardAggregator, RoundAnnouncer,
    RoundLifecycle,
};
use league_engine::store::{LeagueStore, PostgresStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = LeagueConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting league-engine");

    // Connect storage and apply migrations
    let store: Arc<dyn LeagueStore> = Arc::new(PostgresStore::connect(&config).await?);

    // Collaborator stand-ins; real platform integrations plug in here.
    let detector: Arc<dyn LanguageDetector> = Arc::new(DisabledDetector);
    let roles: Arc<dyn RoleApi> = Arc::new(LoggingRoleApi);
    let notifier: Arc<dyn NotificationSink> = Arc::new(LoggingNotifier);

    // Process-local mutable state
    let cooldowns = Arc::new(CooldownTracker::new(tokio::time::Duration::from_secs(
        config.cooldown_secs,
    )));
    let cache = Arc::new(LeaderboardCache::new(tokio::time::Duration::from_secs(
        config.cache_ttl_secs,
    )));

    // Service layer
    let gate = ActivityGate::new(
        Arc::clone(&store),
        detector,
        Arc::clone(&cooldowns),
        config.tracked_guild_id,
        config.daily_event_cap,
        config.min_content_length,
    );
    let recorder = ActivityRecorder::new(Arc::clone(&store), Arc::clone(&cache));
    let leaderboard = Arc::new(LeaderboardAggregator::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        config.active_day_bonus,
    ));
    let announcer = RoundAnnouncer::new(notifier, ChannelId::new(config.announce_channel_id));
    let lifecycle = Arc::new(RoundLifecycle::new(
        Arc::clone(&store),
        Arc::clone(&leaderboard),
        Arc::clone(&cache),
        roles,
        announcer,
        config.champions_per_board,
        config.winner_fetch_limit,
    ));
    let league = Arc::new(LeagueService::new(
        Arc::clone(&store),
        gate,
        recorder,
        leaderboard,
        config.points_per_event,
    ));

    // A round must exist before the first event arrives.
    let round = lifecycle.ensure_active_round().await?;
    tracing::info!(round_number = round.round_number, end_time = %round.end_time, "active round");

    // Background tasks with a shared shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticker = spawn_round_ticker(
        Arc::clone(&lifecycle),
        tokio::time::Duration::from_secs(config.round_check_interval_secs),
        shutdown_rx.clone(),
    );
    let sweeper = spawn_cooldown_sweeper(
        Arc::clone(&cooldowns),
        tokio::time::Duration::from_secs(config.cooldown_sweep_interval_secs),
        shutdown_rx,
    );

    // Build application state and router
    let app_state = AppState { league, lifecycle };
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    // Stop background tasks; an in-flight close runs to completion.
    let _ = shutdown_tx.send(true);
    let _ = ticker.await;
    let _ = sweeper.await;
    tracing::info!("shutdown complete");

    Ok(())
}
