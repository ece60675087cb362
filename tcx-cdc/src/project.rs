//! Stateless envelope → broker message transform (§4.6).

use tcx_core::outbox_row::OutboxContextColumns;
use tcx_core::{broker, BrokerMessage};

use crate::envelope::CdcEnvelope;
use crate::routing;

#[derive(Debug, Clone)]
pub struct ProjectedMessage {
    pub topic: &'static str,
    pub message: BrokerMessage,
}

/// Project one envelope into a broker message, or `None` when the row
/// itself can't be read (missing aggregate id, event type, or payload) —
/// the genuine dead-letter case of §4.5's failure semantics, distinct from
/// a merely-malformed trace pair (I2), which still produces a message, just
/// without a `traceparent` header (step 4; `build_broker_headers` already
/// enforces that by only trusting a row whose trace columns are both valid).
pub fn project(envelope: &CdcEnvelope, default_trace_flags: &str) -> Option<ProjectedMessage> {
    let aggregate_id = envelope.aggregate_id.clone()?;
    let event_type = envelope.event_type.as_deref()?;
    let payload = envelope.payload.clone()?;

    let cols = OutboxContextColumns {
        trace_id: envelope.trace_id.clone(),
        parent_span_id: envelope.parent_span_id.clone(),
        trace_flags: envelope.trace_flags.clone(),
        tenant_id: envelope.tenant_id.clone().unwrap_or_default(),
        user_id: envelope.user_id.clone().unwrap_or_default(),
        request_id: envelope.request_id.clone().unwrap_or_default(),
        service_name: envelope.service_name.clone().unwrap_or_default(),
        transaction_type: envelope.transaction_type.clone().unwrap_or_default(),
        created_by: envelope.created_by.clone().unwrap_or_default(),
    };

    let headers = broker::build_broker_headers(&cols, default_trace_flags);
    let payload_bytes = serde_json::to_vec(&payload).ok()?;

    Some(ProjectedMessage {
        topic: routing::topic_for(event_type),
        message: BrokerMessage { key: aggregate_id, payload: payload_bytes, headers },
    })
}
