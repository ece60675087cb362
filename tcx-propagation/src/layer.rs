//! Inbound half of the Synchronous Propagator (§4.4): a Tower `Layer`/
//! `Service` pair, grounded on `r2e-observability::middleware::OtelTraceLayer`'s
//! shape (parse headers → start/continue a span → wrap the inner call's
//! future so the span covers the whole request).
//!
//! Where the teacher's layer only starts a span, this one additionally
//! binds the [`crate::scope::Scope`] task-local for the request, so every
//! log line and outbound call downstream observes the parsed context
//! without threading it through function signatures.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::Request;
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use tcx_core::{headers, TraceContext};

use crate::scope::Scope;

/// Installs [`PropagationService`] around an inner service. `service_name`
/// is this service's own name, used when the inbound `X-Service-Name`
/// header is absent and also recorded as `service.name` on the span.
#[derive(Clone)]
pub struct PropagationLayer {
    service_name: String,
}

impl PropagationLayer {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }
}

impl<S> Layer<S> for PropagationLayer {
    type Service = PropagationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PropagationService { inner, service_name: self.service_name.clone() }
    }
}

#[derive(Clone)]
pub struct PropagationService<S> {
    inner: S,
    service_name: String,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PropagationService<S>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let parsed = headers::parse_headers(req.headers());

        // §4.4: continue the inbound trace if `traceparent` was valid,
        // otherwise start a root span — either way a span id exists for
        // the remainder of the request.
        let trace = parsed.trace_context.clone().unwrap_or_else(|| {
            TraceContext::new_root(new_hex_id(32), new_hex_id(16))
        });

        let fallback_request_id = new_hex_id(32);
        let standard = headers::standard_context_from_parsed(
            &parsed,
            fallback_request_id,
            trace.trace_id.clone(),
            self.service_name.clone(),
        );

        let malformed: Vec<&'static str> = parsed.malformed.iter().map(|f| f.0).collect();

        let span = tracing::info_span!(
            "http.request",
            otel.kind = "server",
            tenant.id = %standard.tenant_id,
            user.id = %standard.user_id,
            request.id = %standard.request_id,
            transaction.type = %standard.transaction_type,
            origin.service = standard.origin_service.as_deref().unwrap_or(""),
            context.malformed = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        );
        if !malformed.is_empty() {
            span.record("context.malformed", malformed.join(","));
        }

        let scope = Scope { standard, trace, malformed };

        let mut inner = self.inner.clone();
        let fut = async move {
            let _enter = span.enter();
            crate::scope::bind(scope, inner.call(req)).await
        };
        Box::pin(FutureInSpan { inner: fut })
    }
}

pin_project! {
    struct FutureInSpan<F> {
        #[pin]
        inner: F,
    }
}

impl<F: Future> Future for FutureInSpan<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().inner.poll(cx)
    }
}

/// `hex_len / 2` random bytes rendered as lowercase hex — the shape a
/// `trace_id` (32 chars) or `span_id`/`request_id` (16 chars) needs.
fn new_hex_id(hex_len: usize) -> String {
    uuid::Uuid::new_v4().simple().to_string()[..hex_len].to_string()
}
