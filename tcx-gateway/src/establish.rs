//! Gateway Context Establisher (§4.3): the public `establish()` operation.

use std::time::Duration;

use http::{HeaderMap, Method};
use tcx_cache::ContextStore;
use tcx_config::TcxOptions;
use tcx_core::standard::MAX_FIELD_BYTES;
use tcx_core::{CoreError, StandardContext};
use tcx_security::Validator;
use tracing::{info, warn};

use crate::transaction_type;

/// Everything [`establish`] produces: the enriched context plus whether the
/// caller presented and passed authentication (distinct from merely having
/// a non-anonymous `user_id`, since `require_auth=false` callers with a bad
/// token also land on the anonymous identity).
#[derive(Debug, Clone)]
pub struct Established {
    pub context: StandardContext,
    pub authenticated: bool,
}

/// Run the six steps of §4.3 against one inbound request.
///
/// `route_pattern` is the matched route template used for transaction-type
/// classification (e.g. `/links/:id`), not the literal path.
#[allow(clippy::too_many_arguments)]
pub async fn establish<V: Validator>(
    headers: &HeaderMap,
    method: &Method,
    route_pattern: &str,
    trace_id: &str,
    validator: &V,
    store: &dyn ContextStore,
    options: &TcxOptions,
    service_name: &str,
) -> Result<Established, CoreError> {
    let token = extract_bearer(headers);
    let request_id = correlation_id_header(headers).unwrap_or_else(new_request_id);
    let correlation_id = trace_id.to_string();
    let transaction_type = transaction_type::classify(method, route_pattern);
    let origin_service = header_str(headers, "x-service-name").map(bounded);

    if token.is_none() && options.require_auth {
        return Err(CoreError::AuthenticationFailed("missing bearer token".to_string()));
    }

    let timeout = Duration::from_millis(options.cache_timeout_ms.max(0) as u64);

    let (claims, authenticated) = match token {
        None => (None, false),
        Some(token) => {
            let fingerprint = tcx_cache::fingerprint(token);
            if let Some(cached) = tcx_cache::get_with_timeout(store, &fingerprint, timeout).await {
                (Some(cached), true)
            } else {
                match validator.validate(token).await {
                    Ok(claims) => {
                        let now = chrono::Utc::now().timestamp();
                        let ttl_seconds = (claims.not_after - now).max(1).min(options.cache_ttl_cap_seconds.max(1)) as u64;
                        tcx_cache::set_with_timeout(store, &fingerprint, claims.clone(), Duration::from_secs(ttl_seconds), timeout).await;
                        (Some(claims), true)
                    }
                    Err(err) => {
                        if options.require_auth {
                            warn!(error = %err, "authentication required and validator rejected token");
                            return Err(CoreError::AuthenticationFailed(err.to_string()));
                        }
                        info!(error = %err, "validator rejected token, falling back to anonymous (require_auth=false)");
                        (None, false)
                    }
                }
            }
        }
    };

    let context = match claims {
        Some(c) => StandardContext::builder()
            .tenant_id(c.tenant_id)
            .user_id(c.subject)
            .user_email(c.email)
            .user_groups(c.groups)
            .request_id(request_id)
            .correlation_id(correlation_id)
            .service_name(service_name)
            .transaction_type(transaction_type)
            .origin_service(origin_service)
            .build(),
        None => StandardContext::builder()
            .tenant_id("public")
            .user_id(StandardContext::DEFAULT_USER)
            .request_id(request_id)
            .correlation_id(correlation_id)
            .service_name(service_name)
            .transaction_type(transaction_type)
            .origin_service(origin_service)
            .build(),
    };

    Ok(Established { context, authenticated })
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ").map(str::trim)
}

fn correlation_id_header(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, "x-correlation-id")?;
    if raw.is_empty() || raw.len() > MAX_FIELD_BYTES {
        return None;
    }
    Some(raw.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn bounded(value: &str) -> String {
    if value.len() > MAX_FIELD_BYTES {
        value[..MAX_FIELD_BYTES].to_string()
    } else {
        value.to_string()
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tcx_cache::InMemoryContextStore;
    use tcx_core::TokenClaims;
    use tcx_security::SecurityError;

    struct StubValidator {
        result: Result<TokenClaims, &'static str>,
        calls: AtomicUsize,
    }

    impl Validator for StubValidator {
        async fn validate(&self, _token: &str) -> Result<TokenClaims, SecurityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|e| SecurityError::InvalidToken(e.to_string()))
        }
    }

    fn opts() -> TcxOptions {
        tcx_config::TcxConfig::empty().options()
    }

    fn claims() -> TokenClaims {
        TokenClaims {
            subject: "u-1".to_string(),
            tenant_id: "tenant-a".to_string(),
            email: None,
            groups: vec!["admin".to_string()],
            scopes: vec![],
            not_after: chrono::Utc::now().timestamp() + 3600,
        }
    }

    #[tokio::test]
    async fn absent_token_yields_anonymous_context() {
        let headers = HeaderMap::new();
        let store = InMemoryContextStore::new();
        let validator = StubValidator { result: Ok(claims()), calls: AtomicUsize::new(0) };
        let result = establish(&headers, &Method::GET, "/links", "a".repeat(32).as_str(), &validator, &store, &opts(), "link-svc").await.unwrap();
        assert_eq!(result.context.user_id, "anonymous");
        assert_eq!(result.context.tenant_id, "public");
        assert!(!result.authenticated);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_token_populates_context_and_caches() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer good-token".parse().unwrap());
        let store = InMemoryContextStore::new();
        let validator = StubValidator { result: Ok(claims()), calls: AtomicUsize::new(0) };
        let result = establish(&headers, &Method::GET, "/links", "a".repeat(32).as_str(), &validator, &store, &opts(), "link-svc").await.unwrap();
        assert_eq!(result.context.user_id, "u-1");
        assert_eq!(result.context.tenant_id, "tenant-a");
        assert!(result.authenticated);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);

        // Second call with the same token hits the cache, not the validator.
        let result2 = establish(&headers, &Method::GET, "/links", "a".repeat(32).as_str(), &validator, &store, &opts(), "link-svc").await.unwrap();
        assert_eq!(result2.context.user_id, "u-1");
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_token_with_require_auth_false_falls_back_to_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer bad-token".parse().unwrap());
        let store = InMemoryContextStore::new();
        let validator = StubValidator { result: Err("boom"), calls: AtomicUsize::new(0) };
        let result = establish(&headers, &Method::GET, "/links", "a".repeat(32).as_str(), &validator, &store, &opts(), "link-svc").await.unwrap();
        assert_eq!(result.context.user_id, "anonymous");
        assert_eq!(result.context.tenant_id, "public");
        assert!(!result.authenticated);
    }

    #[tokio::test]
    async fn invalid_token_with_require_auth_true_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer bad-token".parse().unwrap());
        let store = InMemoryContextStore::new();
        let validator = StubValidator { result: Err("boom"), calls: AtomicUsize::new(0) };
        let mut options = opts();
        options.require_auth = true;
        let err = establish(&headers, &Method::GET, "/links", "a".repeat(32).as_str(), &validator, &store, &options, "link-svc").await.unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn missing_token_with_require_auth_true_is_rejected() {
        let headers = HeaderMap::new();
        let store = InMemoryContextStore::new();
        let validator = StubValidator { result: Ok(claims()), calls: AtomicUsize::new(0) };
        let mut options = opts();
        options.require_auth = true;
        let err = establish(&headers, &Method::GET, "/links", "a".repeat(32).as_str(), &validator, &store, &options, "link-svc").await.unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed(_)));
    }
}
