//! `OutboxRepository::append` (§4.5 steps 1-4).
//!
//! Takes the caller's already-open transaction rather than a pool: the
//! domain write and the outbox insert commit or roll back together (I1).
//! There is no `ManagedResource`/DI wrapper here — callers pass a plain
//! `sqlx::Transaction` they already own.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use tcx_core::{OutboxContextColumns, StandardContext, TraceContext};

use crate::error::OutboxError;
use crate::event::{OutboxEvent, OutboxStatus};

pub struct OutboxRepository;

impl OutboxRepository {
    /// Append one event row within `tx`. `ctx`/`trace` are read once at
    /// call time and frozen onto the row (I3); later changes to either
    /// never reach rows already written.
    pub async fn append(
        tx: &mut Transaction<'_, Postgres>,
        ctx: &StandardContext,
        trace: Option<&TraceContext>,
        event_type: &str,
        aggregate_type: &str,
        aggregate_id: &str,
        payload: &serde_json::Value,
    ) -> Result<OutboxEvent, OutboxError> {
        let cols = OutboxContextColumns::from_contexts(ctx, trace);
        let id = Uuid::new_v4();

        let row = sqlx::query_as::<_, OutboxEvent>(
            "INSERT INTO outbox_events \
                (id, aggregate_type, aggregate_id, event_type, payload, status, retry_count, \
                 trace_id, parent_span_id, trace_flags, \
                 tenant_id, user_id, request_id, service_name, transaction_type, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING id, aggregate_type, aggregate_id, event_type, payload, status, retry_count, \
                 trace_id, parent_span_id, trace_flags, \
                 tenant_id, user_id, request_id, service_name, transaction_type, created_by, \
                 created_at, processed_at",
        )
        .bind(id)
        .bind(aggregate_type)
        .bind(aggregate_id)
        .bind(event_type)
        .bind(payload)
        .bind(OutboxStatus::Pending)
        .bind(&cols.trace_id)
        .bind(&cols.parent_span_id)
        .bind(&cols.trace_flags)
        .bind(&cols.tenant_id)
        .bind(&cols.user_id)
        .bind(&cols.request_id)
        .bind(&cols.service_name)
        .bind(&cols.transaction_type)
        .bind(&cols.created_by)
        .fetch_one(&mut *tx)
        .await?;

        Ok(row)
    }

    /// Rows the CDC projector dead-lettered or the broker publish failed
    /// on, surfaced for an operator-driven retry. The retry policy itself
    /// (backoff, max attempts) is deployment-defined, not enforced here.
    pub async fn retryable(
        pool: &sqlx::Pool<Postgres>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, OutboxError> {
        let rows = sqlx::query_as::<_, OutboxEvent>(
            "SELECT id, aggregate_type, aggregate_id, event_type, payload, status, retry_count, \
                 trace_id, parent_span_id, trace_flags, \
                 tenant_id, user_id, request_id, service_name, transaction_type, created_by, \
                 created_at, processed_at \
             FROM outbox_events WHERE status = $1 ORDER BY created_at ASC LIMIT $2",
        )
        .bind(OutboxStatus::Failed)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Mark a row `PROCESSED`; called by the reconciler once the broker
    /// publish is confirmed (§4.6 step 7).
    pub async fn mark_processed(pool: &sqlx::Pool<Postgres>, id: Uuid) -> Result<(), OutboxError> {
        sqlx::query("UPDATE outbox_events SET status = $1, processed_at = now() WHERE id = $2")
            .bind(OutboxStatus::Processed)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a row `FAILED` after a dead-lettered publish attempt, bumping
    /// `retry_count`. `PENDING` rows are left untouched (§4.5 failure
    /// semantics: a cleanup policy must never delete a row still `PENDING`).
    pub async fn mark_failed(pool: &sqlx::Pool<Postgres>, id: Uuid) -> Result<(), OutboxError> {
        sqlx::query("UPDATE outbox_events SET status = $1, retry_count = retry_count + 1 WHERE id = $2")
            .bind(OutboxStatus::Failed)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcx_core::StandardContext;

    fn ctx() -> StandardContext {
        StandardContext::builder()
            .tenant_id("t-9")
            .user_id("u-1")
            .request_id("req-1")
            .correlation_id("req-1")
            .service_name("link-svc")
            .transaction_type("POST-links")
            .build()
    }

    // `append`/`retryable`/`mark_processed` all require a live Postgres
    // connection to exercise end to end; that coverage belongs to a
    // deployment's integration suite, not this crate's unit tests. What's
    // testable in isolation is the context-column projection they build on.
    #[test]
    fn context_columns_built_from_ambient_context_and_trace() {
        let trace = TraceContext::new_root("a".repeat(32), "b".repeat(16));
        let cols = OutboxContextColumns::from_contexts(&ctx(), Some(&trace));
        assert_eq!(cols.tenant_id, "t-9");
        assert_eq!(cols.created_by, "u-1");
        assert_eq!(cols.trace_id.as_deref(), Some(trace.trace_id.as_str()));
    }

    #[test]
    fn context_columns_without_trace_leave_trace_fields_null() {
        let cols = OutboxContextColumns::from_contexts(&ctx(), None);
        assert!(cols.trace_id.is_none());
        assert!(cols.parent_span_id.is_none());
        assert!(cols.is_valid());
    }
}
