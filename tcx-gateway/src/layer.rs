//! Tower middleware wiring [`crate::establish`] into an axum router.
//!
//! Must sit *inside* a [`tcx_propagation::PropagationLayer`] (i.e. applied
//! with `.route_layer()` after `.layer(PropagationLayer::new(..))`, or
//! nested via `Router::merge`/`.layer()` ordering so Propagation runs
//! first) so a [`tcx_propagation::Scope`] is already bound when this runs —
//! the trace id it reads for `correlation_id` and the scope it re-binds
//! both come from there. Also relies on axum's `MatchedPath` extension for
//! transaction-type classification, so routes should be registered before
//! this layer is applied (`.route_layer`, not a blanket top-level `.layer`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::MatchedPath;
use axum::response::{IntoResponse, Response};
use http::Request;
use tower::{Layer, Service};

use tcx_cache::ContextStore;
use tcx_config::TcxOptions;
use tcx_core::TraceContext;
use tcx_security::Validator;

use crate::establish::establish;

#[derive(Clone)]
pub struct GatewayLayer<V> {
    validator: Arc<V>,
    store: Arc<dyn ContextStore>,
    options: Arc<TcxOptions>,
    service_name: Arc<String>,
}

impl<V> GatewayLayer<V> {
    pub fn new(validator: V, store: Arc<dyn ContextStore>, options: TcxOptions, service_name: impl Into<String>) -> Self {
        Self { validator: Arc::new(validator), store, options: Arc::new(options), service_name: Arc::new(service_name.into()) }
    }
}

impl<S, V> Layer<S> for GatewayLayer<V> {
    type Service = GatewayService<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        GatewayService { inner, layer: self.clone() }
    }
}

#[derive(Clone)]
pub struct GatewayService<S, V> {
    inner: S,
    layer: GatewayLayer<V>,
}

impl<S, V, ReqBody> Service<Request<ReqBody>> for GatewayService<S, V>
where
    S: Service<Request<ReqBody>, Response = Response, Error = std::convert::Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    V: Validator + Send + Sync + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response;
    type Error = std::convert::Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, std::convert::Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let route_pattern = req.extensions().get::<MatchedPath>().map(|p| p.as_str().to_string()).unwrap_or_else(|| req.uri().path().to_string());
        let headers = req.headers().clone();

        let validator = self.layer.validator.clone();
        let store = self.layer.store.clone();
        let options = self.layer.options.clone();
        let service_name = self.layer.service_name.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let inbound_scope = tcx_propagation::try_current();
            let trace = inbound_scope.as_ref().map(|s| s.trace.clone()).unwrap_or_else(|| TraceContext::new_root("0".repeat(32), "0".repeat(16)));

            match establish(&headers, &method, &route_pattern, &trace.trace_id, validator.as_ref(), store.as_ref(), &options, &service_name).await {
                Err(core_err) => Ok(core_err.into_response()),
                Ok(established) => {
                    let span = tracing::Span::current();
                    span.record("tenant.id", established.context.tenant_id.as_str());
                    span.record("user.id", established.context.user_id.as_str());
                    span.record("transaction.type", established.context.transaction_type.as_str());

                    let correlation_id = established.context.correlation_id.clone();
                    let malformed = inbound_scope.as_ref().map(|s| s.malformed.clone()).unwrap_or_default();
                    let new_scope = tcx_propagation::Scope { standard: established.context, trace, malformed };

                    let result = tcx_propagation::bind(new_scope, inner.call(req)).await;
                    match result {
                        Ok(mut resp) => {
                            if let Ok(value) = http::HeaderValue::from_str(&correlation_id) {
                                resp.headers_mut().insert(http::HeaderName::from_static("x-correlation-id"), value);
                            }
                            Ok(resp)
                        }
                        Err(infallible) => match infallible {},
                    }
                }
            }
        })
    }
}
