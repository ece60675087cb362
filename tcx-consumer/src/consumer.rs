//! Per-message consumer adapter (§4.7 steps 1-6).

use tcx_core::headers::{self, ParsedHeaders};
use tcx_core::{broker, BrokerMessage, TraceContext};
use tcx_propagation::{bind, Scope};

/// Process one polled message: reconstruct trace parentage, rebuild the
/// business context, bind the diagnostic scope, and hand off to `handler`.
/// The scope and span are torn down on every exit path — success, handler
/// error, or panic — because both are just future/guard wrappers around
/// `handler`'s own future (R2).
pub async fn process_message<F, Fut, T>(msg: &BrokerMessage, topic: &str, this_service: &str, handler: F) -> T
where
    F: FnOnce(tcx_core::StandardContext) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let recovered_trace = broker::trace_context_from_broker_headers(msg);
    let orphaned = recovered_trace.is_none();
    let trace = recovered_trace.unwrap_or_else(|| TraceContext::new_root(new_hex_id(32), new_hex_id(16)));

    let span = tracing::info_span!(
        "messaging.consume",
        messaging.system = "broker",
        messaging.destination = %topic,
        messaging.operation = "consume",
        messaging.message.id = %msg.key,
        messaging.orphaned = orphaned,
        trace.trace_id = %trace.trace_id,
    );
    if orphaned {
        tracing::warn!(parent: &span, "consumed message carried no valid W3C trace context, starting orphaned root span");
    }

    let parsed = parse_business_headers(msg);
    let fallback_request_id = new_hex_id(32);
    let ctx = headers::standard_context_from_parsed(&parsed, &fallback_request_id, &trace.trace_id, this_service);

    let malformed = parsed.malformed.iter().map(|f| f.0).collect();
    let scope = Scope { standard: ctx.clone(), trace, malformed };

    let _entered = span.enter();
    bind(scope, handler(ctx)).await
}

/// Business (non-trace) headers live in the same names as the HTTP set;
/// reuse the HTTP codec by shuttling the broker's `Vec<(String,String)>`
/// through an `http::HeaderMap`.
fn parse_business_headers(msg: &BrokerMessage) -> ParsedHeaders {
    let mut map = http::HeaderMap::new();
    for (name, value) in &msg.headers {
        if let (Ok(name), Ok(value)) = (http::HeaderName::from_bytes(name.as_bytes()), http::HeaderValue::from_str(value)) {
            map.insert(name, value);
        }
    }
    headers::parse_headers(&map)
}

fn new_hex_id(hex_len: usize) -> String {
    uuid::Uuid::new_v4().simple().to_string()[..hex_len].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcx_core::outbox_row::OutboxContextColumns;
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

    fn message_with_trace() -> BrokerMessage {
        let trace = TraceContext::new_root("a".repeat(32), "b".repeat(16));
        let cols = OutboxContextColumns::from_contexts(&ctx(), Some(&trace));
        let headers = broker::build_broker_headers(&cols, "01");
        BrokerMessage { key: "l-1".to_string(), payload: b"{}".to_vec(), headers }
    }

    fn message_without_trace() -> BrokerMessage {
        let cols = OutboxContextColumns::from_contexts(&ctx(), None);
        let headers = broker::build_broker_headers(&cols, "01");
        BrokerMessage { key: "l-2".to_string(), payload: b"{}".to_vec(), headers }
    }

    #[tokio::test]
    async fn rebuilds_context_and_binds_scope_for_handler() {
        let msg = message_with_trace();
        let seen_tenant = process_message(&msg, "link-events", "consumer-svc", |ctx| async move { ctx.tenant_id.clone() }).await;
        assert_eq!(seen_tenant, "t-9");
    }

    #[tokio::test]
    async fn handler_sees_bound_scope_matching_rebuilt_context() {
        let msg = message_with_trace();
        let matched = process_message(&msg, "link-events", "consumer-svc", |ctx| async move {
            let scope = tcx_propagation::try_current().unwrap();
            scope.standard.tenant_id == ctx.tenant_id
        })
        .await;
        assert!(matched);
    }

    #[tokio::test]
    async fn missing_trace_headers_yield_orphaned_root_trace() {
        let msg = message_without_trace();
        let trace_id = process_message(&msg, "link-events", "consumer-svc", |_ctx| async move {
            tcx_propagation::try_current().unwrap().trace.trace_id
        })
        .await;
        assert_eq!(trace_id.len(), 32);
    }

    #[tokio::test]
    async fn scope_is_released_after_handler_returns() {
        let msg = message_with_trace();
        process_message(&msg, "link-events", "consumer-svc", |_ctx| async move {}).await;
        assert!(tcx_propagation::try_current().is_none());
    }
}
