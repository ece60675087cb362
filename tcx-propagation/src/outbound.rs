//! Outbound half of the Synchronous Propagator (§4.4): inject the current
//! scope's header set into an outgoing `reqwest` request. `X-Service-Name`
//! is always *this* service (the caller), regardless of what arrived on
//! `X-Origin-Service` inbound — that header identifies who originated the
//! request chain, not who is making this particular hop.

use reqwest::RequestBuilder;

use tcx_core::headers;

use crate::scope::try_current;

/// Inject the bound scope's headers onto `builder`. A no-op (returns
/// `builder` unchanged) if called outside a bound scope — outbound calls
/// made from contexts the propagator never wrapped (e.g. ad hoc tooling)
/// simply go out unadorned rather than panicking.
pub fn inject(builder: RequestBuilder, this_service: &str) -> RequestBuilder {
    let Some(scope) = try_current() else { return builder };

    let mut ctx = scope.standard;
    ctx.service_name = this_service.to_string();

    let mut header_map = http::HeaderMap::new();
    headers::write_headers(&mut header_map, &ctx, Some(&scope.trace));

    builder.headers(header_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcx_core::{StandardContext, TraceContext};

    #[tokio::test]
    async fn injects_headers_from_bound_scope() {
        let scope = crate::scope::Scope {
            standard: StandardContext::builder()
                .tenant_id("t-9")
                .user_id("u-1")
                .request_id("req-1")
                .correlation_id("req-1")
                .service_name("gateway")
                .transaction_type("GET-links")
                .build(),
            trace: TraceContext::new_root("a".repeat(32), "b".repeat(16)),
            malformed: vec![],
        };

        let client = reqwest::Client::new();
        crate::scope::bind(scope, async {
            let builder = client.get("https://example.invalid/resource");
            let req = inject(builder, "link-svc").build().unwrap();
            assert_eq!(req.headers().get("x-tenant-id").unwrap(), "t-9");
            assert_eq!(req.headers().get("x-service-name").unwrap(), "link-svc");
        })
        .await;
    }

    #[tokio::test]
    async fn traceparent_header_matches_bound_trace() {
        let trace = TraceContext::new_root("a".repeat(32), "b".repeat(16));
        let scope = crate::scope::Scope {
            standard: StandardContext::anonymous("r", "c", "gateway", "GET-x"),
            trace: trace.clone(),
            malformed: vec![],
        };
        let client = reqwest::Client::new();
        crate::scope::bind(scope, async {
            let builder = client.get("https://example.invalid/resource");
            let req = inject(builder, "link-svc").build().unwrap();
            assert_eq!(req.headers().get("traceparent").unwrap(), trace.to_traceparent().as_str());
        })
        .await;
    }

    #[tokio::test]
    async fn no_scope_bound_leaves_request_unadorned() {
        let client = reqwest::Client::new();
        let builder = client.get("https://example.invalid/resource");
        let req = inject(builder, "link-svc").build().unwrap();
        assert!(req.headers().get("x-tenant-id").is_none());
    }
}
