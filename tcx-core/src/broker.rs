//! Broker-message codec (§4.1, §6): the same header names and byte values
//! as the synchronous HTTP set, plus a fallback triple for consumers that
//! cannot read `traceparent` directly. The envelope carries no context —
//! context lives on headers only (§4.1).

use crate::headers;
use crate::outbox_row::OutboxContextColumns;

pub const FALLBACK_TRACE_ID: &str = "trace_id";
pub const FALLBACK_PARENT_SPAN_ID: &str = "parent_span_id";
pub const FALLBACK_TRACE_FLAGS: &str = "trace_flags";

/// A message ready to hand to a broker client: key, opaque payload bytes,
/// and headers. Never embeds context in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl BrokerMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Build the header list for a broker message from outbox context columns.
/// `traceparent` is only emitted when the row's trace fields are both
/// present and valid (I5: never synthesized from anything but the row).
/// One header is emitted per non-null context column; malformed ones are
/// omitted, never emitted empty (§4.6 step 4-5).
pub fn build_broker_headers(cols: &OutboxContextColumns, default_flags: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();

    if let Some(trace) = cols.trace_context(default_flags) {
        out.push((headers::TRACEPARENT.to_string(), trace.to_traceparent()));
        out.push((FALLBACK_TRACE_ID.to_string(), trace.trace_id.clone()));
        out.push((FALLBACK_PARENT_SPAN_ID.to_string(), trace.span_id.clone()));
        out.push((FALLBACK_TRACE_FLAGS.to_string(), format!("{:02x}", trace.flags)));
    }

    push_if_nonempty(&mut out, headers::X_TENANT_ID, &cols.tenant_id);
    push_if_nonempty(&mut out, headers::X_USER_ID, &cols.user_id);
    push_if_nonempty(&mut out, headers::X_REQUEST_ID, &cols.request_id);
    push_if_nonempty(&mut out, headers::X_SERVICE_NAME, &cols.service_name);
    push_if_nonempty(&mut out, headers::X_TRANSACTION_TYPE, &cols.transaction_type);

    out
}

fn push_if_nonempty(out: &mut Vec<(String, String)>, name: &'static str, value: &str) {
    if !value.is_empty() {
        out.push((name.to_string(), value.to_string()));
    }
}

/// Recover a `TraceContext` from consumer-visible broker headers, preferring
/// `traceparent` and falling back to the triple (§4.7 step 1).
pub fn trace_context_from_broker_headers(msg: &BrokerMessage) -> Option<crate::trace::TraceContext> {
    if let Some(tp) = msg.header(headers::TRACEPARENT) {
        if let Some(ctx) = crate::trace::TraceContext::parse_traceparent(tp) {
            return Some(ctx);
        }
    }
    let trace_id = msg.header(FALLBACK_TRACE_ID)?;
    let span_id = msg.header(FALLBACK_PARENT_SPAN_ID)?;
    if !crate::trace::TraceContext::is_valid_trace_id(trace_id)
        || !crate::trace::TraceContext::is_valid_span_id(span_id)
    {
        return None;
    }
    let flags = msg
        .header(FALLBACK_TRACE_FLAGS)
        .and_then(|f| u8::from_str_radix(f, 16).ok())
        .unwrap_or(0x01);
    Some(crate::trace::TraceContext {
        version: 0,
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        flags,
        tracestate: None,
    })
}
