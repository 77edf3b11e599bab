//! Background tasks: the round-boundary ticker and the cooldown sweep.
//!
//! Both loops watch a shared shutdown signal and exit between ticks, so an
//! in-flight close always runs to completion; a close interrupted by
//! process death is safely re-entrant on restart thanks to the ACTIVE-round
//! guard.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info};

use crate::domain::CooldownTracker;
use crate::service::{CloseTrigger, RoundLifecycle};

/// Spawns the periodic round-boundary check.
///
/// Every `interval` the task invokes
/// [`close_if_due`](RoundLifecycle::close_if_due) with
/// [`CloseTrigger::Scheduled`]; the lifecycle decides whether the boundary
/// has been reached. Store failures are logged and retried on the next
/// tick.
pub fn spawn_round_ticker(
    lifecycle: Arc<RoundLifecycle>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "round ticker started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("round ticker received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match lifecycle.close_if_due(CloseTrigger::Scheduled).await {
                        Ok(Some(outcome)) => {
                            info!(
                                closed = %outcome.plan.round.round_id,
                                next = %outcome.next.round_id,
                                "scheduled close committed"
                            );
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(error = %e, "scheduled close failed, will retry next tick");
                        }
                    }
                }
            }
        }

        info!("round ticker shutdown complete");
    })
}

/// Spawns the periodic cooldown-map eviction sweep.
pub fn spawn_cooldown_sweeper(
    cooldowns: Arc<CooldownTracker>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "cooldown sweeper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("cooldown sweeper received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let evicted = cooldowns.sweep().await;
                    if evicted > 0 {
                        let remaining = cooldowns.len().await;
                        debug!(evicted, remaining, "cooldown sweep");
                    }
                }
            }
        }

        info!("cooldown sweeper shutdown complete");
    })
}
