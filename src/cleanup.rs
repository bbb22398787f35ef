//! Scheduled removal of expired refresh tokens and idle rate limiter state.
//!
//! Expired rows are already ignored on read, so this only keeps the table
//! small.

use crate::db::Database;
use crate::rate_limit::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Interval between rate limiter pruning runs.
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    match db.tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; startup already ran a pass
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

/// Spawn a background task that drops replenished clients from the rate
/// limiters. The task ends once the router owning the limiters is dropped.
pub fn spawn_rate_limit_pruner(config: &Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    let config = Arc::downgrade(config);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(config) = config.upgrade() else {
                break;
            };
            config.retain_recent();
            debug!(clients = config.tracked_clients(), "Pruned rate limiter state");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DEFAULT_ROLE;

    #[tokio::test]
    async fn test_run_cleanup_keeps_live_tokens() {
        let db = Database::open(":memory:").await.unwrap();
        let user = db
            .users()
            .create("alice@example.com", "hash", &[DEFAULT_ROLE.to_string()])
            .await
            .unwrap();
        db.tokens().create(&user.id, 0).await.unwrap();
        let live = db.tokens().create(&user.id, 3600).await.unwrap();

        run_cleanup(&db).await;

        assert_eq!(db.tokens().count_for_user(&user.id).await.unwrap(), 1);
        assert!(
            db.tokens()
                .find_by_value(&live.value)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_pruner_does_not_keep_limiters_alive() {
        let limits = Arc::new(RateLimitConfig::new(false));
        let handle = spawn_rate_limit_pruner(&limits);

        assert_eq!(Arc::strong_count(&limits), 1);
        handle.abort();
    }
}
