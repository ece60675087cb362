//! Outbox-row context codec (§4.1, §6).
//!
//! The columns that carry context alongside an `outbox_events` row. This
//! crate only owns the *shape* and conversions; `tcx-outbox` owns the table
//! and the INSERT/SELECT statements.

use serde::{Deserialize, Serialize};

use crate::standard::StandardContext;
use crate::trace::TraceContext;

/// Context columns stored on every outbox row (§6 bit-sensitive columns).
///
/// I2: `trace_id`/`parent_span_id` are either both `Some` or both `None`.
/// Construction through [`OutboxContextColumns::from_contexts`] upholds
/// this; hand-built values that violate it are caught by [`Self::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxContextColumns {
    pub trace_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub trace_flags: Option<String>,
    pub tenant_id: String,
    pub user_id: String,
    pub request_id: String,
    pub service_name: String,
    pub transaction_type: String,
    pub created_by: String,
}

impl OutboxContextColumns {
    /// Build from the producer's `StandardContext` and `TraceContext` at
    /// write time (I3: these are never amended later).
    pub fn from_contexts(ctx: &StandardContext, trace: Option<&TraceContext>) -> Self {
        Self {
            trace_id: trace.map(|t| t.trace_id.clone()),
            parent_span_id: trace.map(|t| t.span_id.clone()),
            trace_flags: trace.map(|t| format!("{:02x}", t.flags)),
            tenant_id: ctx.tenant_id.clone(),
            user_id: ctx.user_id.clone(),
            request_id: ctx.request_id.clone(),
            service_name: ctx.service_name.clone(),
            transaction_type: ctx.transaction_type.clone(),
            created_by: ctx.user_id.clone(),
        }
    }

    /// I2: both trace fields present and valid, or both absent. Anything
    /// else (one present, one absent, or present-but-malformed) is invalid
    /// and must be treated as the dead-letter case by the CDC projector.
    pub fn is_valid(&self) -> bool {
        match (&self.trace_id, &self.parent_span_id) {
            (Some(t), Some(s)) => TraceContext::is_valid_trace_id(t) && TraceContext::is_valid_span_id(s),
            (None, None) => true,
            _ => false,
        }
    }

    /// `Some(TraceContext)` only when both ids are present and the row is
    /// valid; `default_flags` fills in when the row has ids but no flags
    /// column value (spec §6 `cdc.default_trace_flags`).
    pub fn trace_context(&self, default_flags: &str) -> Option<TraceContext> {
        if !self.is_valid() {
            return None;
        }
        let trace_id = self.trace_id.clone()?;
        let span_id = self.parent_span_id.clone()?;
        let flags_hex = self.trace_flags.clone().unwrap_or_else(|| default_flags.to_string());
        let flags = u8::from_str_radix(&flags_hex, 16).unwrap_or(0x01);
        Some(TraceContext {
            version: 0,
            trace_id,
            span_id,
            flags,
            tracestate: None,
        })
    }
}
