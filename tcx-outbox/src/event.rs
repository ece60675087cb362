//! `outbox_events` row shape (§4.5, §6).
//!
//! ```sql
//! CREATE TABLE outbox_events (
//!     id               UUID PRIMARY KEY,
//!     aggregate_type   TEXT NOT NULL,
//!     aggregate_id     TEXT NOT NULL,
//!     event_type       TEXT NOT NULL,
//!     payload          JSONB NOT NULL,
//!     status           TEXT NOT NULL DEFAULT 'PENDING',
//!     retry_count      INTEGER NOT NULL DEFAULT 0,
//!     trace_id         TEXT,
//!     parent_span_id   TEXT,
//!     trace_flags      TEXT,
//!     tenant_id        TEXT NOT NULL,
//!     user_id          TEXT NOT NULL,
//!     request_id       TEXT NOT NULL,
//!     service_name     TEXT NOT NULL,
//!     transaction_type TEXT NOT NULL,
//!     created_by       TEXT NOT NULL,
//!     created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     processed_at     TIMESTAMPTZ
//! );
//! CREATE INDEX outbox_events_aggregate_idx ON outbox_events (aggregate_id, created_at);
//! CREATE INDEX outbox_events_cleanup_idx ON outbox_events (status, processed_at);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tcx_core::OutboxContextColumns;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Processed => "PROCESSED",
            OutboxStatus::Failed => "FAILED",
        }
    }
}

/// A row of `outbox_events`, exactly as written by [`crate::repository::append`]
/// or read back by [`crate::repository::retryable`]/the cleanup task.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub trace_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub trace_flags: Option<String>,
    pub tenant_id: String,
    pub user_id: String,
    pub request_id: String,
    pub service_name: String,
    pub transaction_type: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// The context columns this row carries, in the shape `tcx-cdc` consumes.
    pub fn context_columns(&self) -> OutboxContextColumns {
        OutboxContextColumns {
            trace_id: self.trace_id.clone(),
            parent_span_id: self.parent_span_id.clone(),
            trace_flags: self.trace_flags.clone(),
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id.clone(),
            request_id: self.request_id.clone(),
            service_name: self.service_name.clone(),
            transaction_type: self.transaction_type.clone(),
            created_by: self.created_by.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_display_string() {
        assert_eq!(OutboxStatus::Pending.as_str(), "PENDING");
        assert_eq!(OutboxStatus::Processed.as_str(), "PROCESSED");
        assert_eq!(OutboxStatus::Failed.as_str(), "FAILED");
    }

    #[test]
    fn context_columns_carries_both_trace_fields_or_neither() {
        let row = OutboxEvent {
            id: Uuid::nil(),
            aggregate_type: "link".into(),
            aggregate_id: "l-1".into(),
            event_type: "link.created".into(),
            payload: serde_json::json!({}),
            status: OutboxStatus::Pending,
            retry_count: 0,
            trace_id: Some("a".repeat(32)),
            parent_span_id: Some("b".repeat(16)),
            trace_flags: Some("01".into()),
            tenant_id: "t-1".into(),
            user_id: "u-1".into(),
            request_id: "r-1".into(),
            service_name: "link-svc".into(),
            transaction_type: "POST-links".into(),
            created_by: "u-1".into(),
            created_at: Utc::now(),
            processed_at: None,
        };
        assert!(row.context_columns().is_valid());
    }
}
