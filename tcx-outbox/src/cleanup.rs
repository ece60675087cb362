//! Retention-based cleanup of `PROCESSED` outbox rows (§4.5).
//!
//! Shaped after the cancellation-token-driven background loop a scheduler
//! plugin would start for you, trimmed to a plain loop: this is a library
//! crate, not a controller-registration DI layer, so there is no task
//! registry or bean injection here — the caller owns a `CleanupTask` and
//! decides when to `spawn` it.

use std::time::Duration;

use sqlx::{Pool, Postgres};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tcx_core::StandardContext;

use crate::error::OutboxError;
use crate::event::OutboxStatus;

pub struct CleanupTask {
    pool: Pool<Postgres>,
    retention: Duration,
    interval: Duration,
    service_name: String,
}

impl CleanupTask {
    pub fn new(pool: Pool<Postgres>, retention: Duration, interval: Duration, service_name: impl Into<String>) -> Self {
        Self { pool, retention, interval, service_name: service_name.into() }
    }

    /// Run until `token` is cancelled. Cleanup is serialized per process:
    /// this loop never overlaps two deletes (each tick awaits the previous
    /// one to finish before sleeping again), so callers should spawn at
    /// most one of these per service instance.
    pub async fn run(&self, token: CancellationToken) {
        let ctx = StandardContext::for_scheduled_job(
            uuid::Uuid::new_v4().simple().to_string(),
            self.service_name.clone(),
            "outbox-cleanup",
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!(tenant.id = %ctx.tenant_id, "outbox cleanup task cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    match delete_processed_older_than(&self.pool, self.retention).await {
                        Ok(deleted) => info!(tenant.id = %ctx.tenant_id, deleted, "outbox cleanup pass complete"),
                        Err(err) => warn!(tenant.id = %ctx.tenant_id, error = %err, "outbox cleanup pass failed"),
                    }
                }
            }
        }
    }
}

/// Delete `PROCESSED` rows older than `retention`. `PENDING`/`FAILED` rows
/// are never touched by this query, regardless of age (§4.5 failure
/// semantics).
async fn delete_processed_older_than(pool: &Pool<Postgres>, retention: Duration) -> Result<u64, OutboxError> {
    let cutoff = chrono::Utc::now() - chrono::Duration::seconds(retention.as_secs() as i64);
    let result = sqlx::query("DELETE FROM outbox_events WHERE status = $1 AND processed_at < $2")
        .bind(OutboxStatus::Processed)
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_moves_backward_by_retention_window() {
        let retention = Duration::from_secs(7 * 24 * 3600);
        let now = chrono::Utc::now();
        let cutoff = now - chrono::Duration::seconds(retention.as_secs() as i64);
        assert!(cutoff < now);
        assert_eq!((now - cutoff).num_days(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn run_exits_promptly_once_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        // Construction only touches local fields; without a live pool we
        // can't exercise `run` directly, but confirm the cancellation path
        // itself resolves without hanging.
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_secs(5)) => panic!("cancellation should be immediate"),
        }
    }
}
