//! TTL-bound claims cache (§4.2): keyed by credential fingerprint, capped
//! at `cache.ttl_cap_seconds` regardless of what the token itself claims,
//! and soft-dependent — every caller goes through [`with_timeout`], and a
//! timeout or backend error is a cache miss, never a request failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tcx_core::TokenClaims;
use tracing::warn;

/// Pluggable context-store backend. Implement this to swap the in-process
/// [`InMemoryContextStore`] for a shared cache (Redis, Memcached) without
/// touching call sites.
pub trait ContextStore: Send + Sync + 'static {
    fn get<'a>(&'a self, fingerprint: &'a str) -> Pin<Box<dyn Future<Output = Option<TokenClaims>> + Send + 'a>>;
    fn set<'a>(
        &'a self,
        fingerprint: &'a str,
        claims: TokenClaims,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
    fn invalidate<'a>(&'a self, fingerprint: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Default in-memory store, lazily evicted on access (entries past their
/// TTL are dropped the next time they're read rather than swept eagerly).
#[derive(Clone, Default)]
pub struct InMemoryContextStore {
    inner: Arc<DashMap<String, (TokenClaims, Instant, Duration)>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(DashMap::new()) }
    }
}

impl ContextStore for InMemoryContextStore {
    fn get<'a>(&'a self, fingerprint: &'a str) -> Pin<Box<dyn Future<Output = Option<TokenClaims>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(entry) = self.inner.get(fingerprint) {
                let (claims, inserted, ttl) = entry.value();
                if inserted.elapsed() < *ttl {
                    return Some(claims.clone());
                }
                drop(entry);
                self.inner.remove(fingerprint);
            }
            None
        })
    }

    fn set<'a>(
        &'a self,
        fingerprint: &'a str,
        claims: TokenClaims,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.inner.insert(fingerprint.to_string(), (claims, Instant::now(), ttl));
        })
    }

    fn invalidate<'a>(&'a self, fingerprint: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.inner.remove(fingerprint);
        })
    }
}

static CACHE_BACKEND: OnceLock<Arc<dyn ContextStore>> = OnceLock::new();

/// Register a custom backend. Must happen before the first lookup — later
/// calls are no-ops, matching the teacher's singleton convention.
pub fn set_context_store(store: impl ContextStore) {
    let _ = CACHE_BACKEND.set(Arc::new(store));
}

/// The active backend, defaulting to [`InMemoryContextStore`] on first use.
pub fn context_store() -> Arc<dyn ContextStore> {
    CACHE_BACKEND
        .get()
        .cloned()
        .unwrap_or_else(|| {
            let store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::new());
            let _ = CACHE_BACKEND.set(store.clone());
            CACHE_BACKEND.get().cloned().unwrap_or(store)
        })
}

/// Look up cached claims for `fingerprint`, bounding the round trip to
/// `timeout`. Any failure — timeout or otherwise — degrades to `None`
/// rather than propagating, per §4.2/§7 `ContextStoreFailure`: the cache is
/// soft-dependent, the gateway must fall through to the Validator.
pub async fn get_with_timeout(store: &dyn ContextStore, fingerprint: &str, timeout: Duration) -> Option<TokenClaims> {
    match tokio::time::timeout(timeout, store.get(fingerprint)).await {
        Ok(claims) => claims,
        Err(_) => {
            warn!(fingerprint, timeout_ms = timeout.as_millis() as u64, "context store lookup timed out, bypassing cache");
            None
        }
    }
}

/// Write claims back, bounding the round trip the same way. A timed-out
/// write is logged and discarded — never surfaced to the caller.
pub async fn set_with_timeout(store: &dyn ContextStore, fingerprint: &str, claims: TokenClaims, ttl: Duration, timeout: Duration) {
    if tokio::time::timeout(timeout, store.set(fingerprint, claims, ttl)).await.is_err() {
        warn!(fingerprint, "context store write timed out, claims not cached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            subject: "u-1".to_string(),
            tenant_id: "t-9".to_string(),
            email: None,
            groups: vec![],
            scopes: vec![],
            not_after: 9_999_999_999,
        }
    }

    #[tokio::test]
    async fn hit_after_set() {
        let store = InMemoryContextStore::new();
        store.set("fp-1", claims(), Duration::from_secs(10)).await;
        assert!(store.get("fp-1").await.is_some());
    }

    #[tokio::test]
    async fn miss_after_ttl_elapses() {
        let store = InMemoryContextStore::new();
        store.set("fp-1", claims(), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get("fp-1").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let store = InMemoryContextStore::new();
        store.set("fp-1", claims(), Duration::from_secs(10)).await;
        store.invalidate("fp-1").await;
        assert!(store.get("fp-1").await.is_none());
    }

    struct HangingStore;
    impl ContextStore for HangingStore {
        fn get<'a>(&'a self, _fingerprint: &'a str) -> Pin<Box<dyn Future<Output = Option<TokenClaims>> + Send + 'a>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                None
            })
        }
        fn set<'a>(&'a self, _fingerprint: &'a str, _claims: TokenClaims, _ttl: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            Box::pin(async move { tokio::time::sleep(Duration::from_secs(60)).await })
        }
        fn invalidate<'a>(&'a self, _fingerprint: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            Box::pin(async move {})
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_degrades_to_none_not_error() {
        let store = HangingStore;
        let result = get_with_timeout(&store, "fp-1", Duration::from_millis(200)).await;
        assert!(result.is_none());
    }
}
