//! Synchronous HTTP header codec (§4.1).
//!
//! The exact header set the core emits and accepts. Header *names* are
//! case-insensitive on read (we use `http::HeaderMap`, which already
//! normalizes lookup) and emitted in this canonical casing.

use http::HeaderMap;

use crate::standard::{clamp_field, StandardContext};
use crate::trace::TraceContext;

pub const TRACEPARENT: &str = "traceparent";
pub const TRACESTATE: &str = "tracestate";
pub const X_TENANT_ID: &str = "x-tenant-id";
pub const X_USER_ID: &str = "x-user-id";
pub const X_USER_EMAIL: &str = "x-user-email";
pub const X_USER_GROUPS: &str = "x-user-groups";
pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_CORRELATION_ID: &str = "x-correlation-id";
pub const X_SERVICE_NAME: &str = "x-service-name";
pub const X_TRANSACTION_TYPE: &str = "x-transaction-type";
pub const X_ORIGIN_SERVICE: &str = "x-origin-service";

/// A field that failed validation and was discarded (§4.1 Failure conditions).
/// Never fatal — callers attach `context.malformed=<field>` and proceed with
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField(pub &'static str);

/// Result of parsing the inbound header set: the two contexts that could be
/// recovered, plus any fields that were discarded as malformed.
#[derive(Debug, Default)]
pub struct ParsedHeaders {
    pub trace_context: Option<TraceContext>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_groups: Vec<String>,
    pub request_id: Option<String>,
    pub correlation_id: Option<String>,
    pub service_name: Option<String>,
    pub transaction_type: Option<String>,
    pub origin_service: Option<String>,
    pub malformed: Vec<MalformedField>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parse the inbound header set. Malformed individual fields are recorded
/// in `malformed` and simply omitted from the result — parsing as a whole
/// never fails (§7 MalformedHeader).
pub fn parse_headers(headers: &HeaderMap) -> ParsedHeaders {
    let mut out = ParsedHeaders::default();

    if let Some(tp) = header_str(headers, TRACEPARENT) {
        match TraceContext::parse_traceparent(tp) {
            Some(mut ctx) => {
                ctx.tracestate = header_str(headers, TRACESTATE).map(|s| s.to_string());
                out.trace_context = Some(ctx);
            }
            None => out.malformed.push(MalformedField("traceparent")),
        }
    }

    out.tenant_id = bounded_field(headers, X_TENANT_ID, &mut out.malformed);
    out.user_id = bounded_field(headers, X_USER_ID, &mut out.malformed);
    out.user_email = bounded_field(headers, X_USER_EMAIL, &mut out.malformed);
    out.request_id = bounded_field(headers, X_REQUEST_ID, &mut out.malformed);
    out.correlation_id = bounded_field(headers, X_CORRELATION_ID, &mut out.malformed);
    out.service_name = bounded_field(headers, X_SERVICE_NAME, &mut out.malformed);
    out.transaction_type = bounded_field(headers, X_TRANSACTION_TYPE, &mut out.malformed);
    out.origin_service = bounded_field(headers, X_ORIGIN_SERVICE, &mut out.malformed);

    if let Some(raw) = header_str(headers, X_USER_GROUPS) {
        if raw.len() > crate::standard::MAX_FIELD_BYTES {
            out.malformed.push(MalformedField("x-user-groups"));
        } else {
            out.user_groups = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    out
}

fn bounded_field(
    headers: &HeaderMap,
    name: &'static str,
    malformed: &mut Vec<MalformedField>,
) -> Option<String> {
    let raw = header_str(headers, name)?;
    if raw.len() > crate::standard::MAX_FIELD_BYTES {
        malformed.push(MalformedField(name));
        return None;
    }
    Some(raw.to_string())
}

/// Emit the canonical header set for a `StandardContext` plus trace
/// context. Omits any header whose source field is absent, rather than
/// emitting an empty value (§4.4 outbound instrumentation).
pub fn write_headers(headers: &mut HeaderMap, ctx: &StandardContext, trace: Option<&TraceContext>) {
    if let Some(trace) = trace {
        insert(headers, TRACEPARENT, &trace.to_traceparent());
        if let Some(ts) = &trace.tracestate {
            insert(headers, TRACESTATE, ts);
        }
    }
    insert(headers, X_TENANT_ID, &ctx.tenant_id);
    insert(headers, X_USER_ID, &ctx.user_id);
    if let Some(email) = &ctx.user_email {
        insert(headers, X_USER_EMAIL, email);
    }
    if !ctx.user_groups.is_empty() {
        insert(headers, X_USER_GROUPS, &ctx.user_groups.join(","));
    }
    insert(headers, X_REQUEST_ID, &ctx.request_id);
    insert(headers, X_CORRELATION_ID, &ctx.correlation_id);
    insert(headers, X_SERVICE_NAME, &ctx.service_name);
    if !ctx.transaction_type.is_empty() {
        insert(headers, X_TRANSACTION_TYPE, &ctx.transaction_type);
    }
    if let Some(origin) = &ctx.origin_service {
        insert(headers, X_ORIGIN_SERVICE, origin);
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(v) = http::HeaderValue::from_str(value) {
        headers.insert(http::HeaderName::from_static(name), v);
    }
}

/// Rebuild a `StandardContext` from parsed headers, filling in defaults for
/// any field that was absent or malformed (§4.7 step 4).
pub fn standard_context_from_parsed(
    parsed: &ParsedHeaders,
    fallback_request_id: impl Into<String>,
    fallback_correlation_id: impl Into<String>,
    this_service: impl Into<String>,
) -> StandardContext {
    StandardContext::builder()
        .tenant_id(
            parsed
                .tenant_id
                .clone()
                .unwrap_or_else(|| StandardContext::DEFAULT_TENANT.to_string()),
        )
        .user_id(
            parsed
                .user_id
                .clone()
                .unwrap_or_else(|| StandardContext::DEFAULT_USER.to_string()),
        )
        .user_email(parsed.user_email.clone())
        .user_groups(parsed.user_groups.clone())
        .request_id(parsed.request_id.clone().unwrap_or_else(|| clamp_field(&fallback_request_id.into())))
        .correlation_id(
            parsed
                .correlation_id
                .clone()
                .unwrap_or_else(|| clamp_field(&fallback_correlation_id.into())),
        )
        .service_name(this_service)
        .transaction_type(parsed.transaction_type.clone().unwrap_or_default())
        .origin_service(parsed.origin_service.clone())
        .build()
}
