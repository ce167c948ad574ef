//! Background reclamation of abandoned upload sessions.
//!
//! Clients that stop uploading mid-session leave chunks behind
//! forever: nothing else removes a session that is never merged and
//! never cleaned up. The sweeper periodically walks the session root
//! and removes sessions older than the configured TTL.

use std::sync::Arc;
use stitch_storage::UploadStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub sessions_examined: usize,
    pub sessions_removed: usize,
    pub errors: usize,
}

/// Remove every session whose age exceeds `ttl`. Errors on individual
/// sessions are counted and logged; the sweep continues.
pub async fn sweep_expired_sessions(
    store: &Arc<dyn UploadStore>,
    ttl: std::time::Duration,
) -> SweepStats {
    let mut stats = SweepStats::default();

    let sessions = match store.list_sessions().await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(error = %e, "Sweep could not list sessions");
            stats.errors += 1;
            return stats;
        }
    };

    for file_id in sessions {
        stats.sessions_examined += 1;
        let age = match store.session_age(&file_id).await {
            Ok(Some(age)) => age,
            // Raced with a merge or cleanup; nothing left to do.
            Ok(None) => continue,
            Err(e) => {
                warn!(%file_id, error = %e, "Sweep could not read session age");
                stats.errors += 1;
                continue;
            }
        };
        if age <= ttl {
            continue;
        }
        match store.remove_session(&file_id).await {
            Ok(()) => {
                stats.sessions_removed += 1;
                metrics::SESSIONS_SWEPT.inc();
                info!(%file_id, age_secs = age.as_secs(), "Swept expired session");
            }
            Err(e) => {
                warn!(%file_id, error = %e, "Sweep could not remove session");
                stats.errors += 1;
            }
        }
    }

    stats
}

/// Spawn the periodic sweep task. Call only when sweeping is enabled.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    let interval = state.config.sweep.interval();
    let ttl = state.config.sweep.session_ttl().unsigned_abs();
    info!(
        interval_secs = interval.as_secs(),
        ttl_secs = ttl.as_secs(),
        "Starting session sweeper"
    );
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a restart loop
        // does not hammer the store.
        timer.tick().await;
        loop {
            timer.tick().await;
            let stats = sweep_expired_sessions(&state.store, ttl).await;
            debug!(
                examined = stats.sessions_examined,
                removed = stats.sessions_removed,
                errors = stats.errors,
                "Sweep pass finished"
            );
        }
    })
}
