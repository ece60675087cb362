use jsonwebtoken::Algorithm;

/// Configuration for the JWKS-backed [`crate::JwtValidator`] (§4.2/§4.3
/// Validator collaborator).
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub jwks_url: String,
    pub issuer: String,
    pub audience: String,
    /// JWKS cache TTL in seconds.
    pub jwks_cache_ttl_secs: u64,
    /// Minimum interval between refresh attempts when a `kid` misses.
    pub jwks_min_refresh_interval_secs: u64,
    pub allowed_algorithms: Vec<Algorithm>,
}

impl SecurityConfig {
    pub fn new(jwks_url: impl Into<String>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_cache_ttl_secs: 3600,
            jwks_min_refresh_interval_secs: 10,
            allowed_algorithms: vec![Algorithm::RS256],
        }
    }

    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.jwks_cache_ttl_secs = ttl_secs;
        self
    }

    pub fn with_min_refresh_interval(mut self, interval_secs: u64) -> Self {
        self.jwks_min_refresh_interval_secs = interval_secs;
        self
    }

    pub fn with_allowed_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.allowed_algorithms = algorithms.into_iter().collect();
        self
    }
}
