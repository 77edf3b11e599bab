//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{LeagueService, RoundLifecycle};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Command facade for membership, ingestion, standings, and admin.
    pub league: Arc<LeagueService>,
    /// Round state machine, for the end-round/preview/seed commands.
    pub lifecycle: Arc<RoundLifecycle>,
}
