//! Scheduled sweep of expired revocation records.

use crate::db::Database;
use crate::jwt::now_secs;
use crate::rate_limit::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Interval between rate limiter pruning runs.
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    let now = match now_secs() {
        Ok(now) => now,
        Err(e) => {
            error!("Skipping cleanup: {}", e);
            return;
        }
    };

    match db.revocations().delete_expired(now).await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired revocation records", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up revocation records: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

/// Drop rate limiter entries for clients that are back to a full budget.
pub fn run_limiter_cleanup(limits: &RateLimitConfig) {
    let tracked = limits.prune();
    debug!(tracked, "Pruned login rate limiter");
}

/// Spawn a background task that prunes the rate limiter periodically.
/// The task ends once the limiter itself has been dropped.
pub fn spawn_limiter_cleanup(limits: &Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    let limits = Arc::downgrade(limits);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            let Some(limits) = limits.upgrade() else {
                break;
            };
            run_limiter_cleanup(&limits);
        }
    })
}
