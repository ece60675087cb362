//! The row envelope a CDC engine hands the projector (§4.6 step 1).
//!
//! Deliberately looser than [`tcx_outbox::OutboxEvent`]: a CDC engine reads
//! off the replication stream, not through our own repository, so every
//! column arrives as an independent nullable field and the projector must
//! treat any of them being absent as a possibility, not an invariant.

use serde::{Deserialize, Serialize};

use tcx_outbox::OutboxEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdcEnvelope {
    pub id: String,
    pub aggregate_type: Option<String>,
    pub aggregate_id: Option<String>,
    pub event_type: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub trace_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub trace_flags: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub service_name: Option<String>,
    pub transaction_type: Option<String>,
    pub created_by: Option<String>,
}

impl From<&OutboxEvent> for CdcEnvelope {
    /// The common case: the CDC engine is reading our own `outbox_events`
    /// table, so every column this crate wrote is present.
    fn from(row: &OutboxEvent) -> Self {
        Self {
            id: row.id.to_string(),
            aggregate_type: Some(row.aggregate_type.clone()),
            aggregate_id: Some(row.aggregate_id.clone()),
            event_type: Some(row.event_type.clone()),
            payload: Some(row.payload.clone()),
            trace_id: row.trace_id.clone(),
            parent_span_id: row.parent_span_id.clone(),
            trace_flags: row.trace_flags.clone(),
            tenant_id: Some(row.tenant_id.clone()),
            user_id: Some(row.user_id.clone()),
            request_id: Some(row.request_id.clone()),
            service_name: Some(row.service_name.clone()),
            transaction_type: Some(row.transaction_type.clone()),
            created_by: Some(row.created_by.clone()),
        }
    }
}
