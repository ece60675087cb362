//! The Validator collaborator (§4.2, §4.3): turns a bearer token into
//! [`TokenClaims`]. The gateway never interprets a token itself — it always
//! goes through an implementation of this trait.

use std::future::Future;
use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use tcx_core::TokenClaims;
use tracing::{debug, warn};

use crate::config::SecurityConfig;
use crate::error::SecurityError;
use crate::jwks::JwksCache;

pub trait Validator: Send + Sync {
    fn validate(&self, token: &str) -> impl Future<Output = Result<TokenClaims, SecurityError>> + Send;
}

enum KeySource {
    Jwks(Arc<JwksCache>),
    Static(DecodingKey),
}

/// JWT validator backed by a JWKS cache (production) or a single static key
/// (tests, or deployments with a fixed signing key).
pub struct JwtValidator {
    key_source: KeySource,
    config: SecurityConfig,
}

impl JwtValidator {
    pub fn new(jwks: Arc<JwksCache>, config: SecurityConfig) -> Self {
        Self { key_source: KeySource::Jwks(jwks), config }
    }

    pub fn new_with_static_key(key: DecodingKey, config: SecurityConfig) -> Self {
        Self { key_source: KeySource::Static(key), config }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    async fn validate_claims(&self, token: &str) -> Result<serde_json::Value, SecurityError> {
        let header = decode_header(token).map_err(|e| SecurityError::InvalidToken(format!("failed to decode header: {e}")))?;
        let algorithm = header.alg;
        debug!(?algorithm, kid = ?header.kid, "decoded JWT header");

        if self.config.allowed_algorithms.is_empty() {
            return Err(SecurityError::ValidationFailed("no allowed JWT algorithms configured".into()));
        }
        if !self.config.allowed_algorithms.contains(&algorithm) {
            return Err(SecurityError::ValidationFailed(format!("disallowed JWT algorithm: {algorithm:?}")));
        }

        let decoding_key = match &self.key_source {
            KeySource::Static(key) => key.clone(),
            KeySource::Jwks(jwks) => {
                let kid = header.kid.as_deref().ok_or_else(|| SecurityError::InvalidToken("JWT header missing 'kid' field".into()))?;
                jwks.get_key(kid).await?
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.algorithms = self.config.allowed_algorithms.clone();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let token_data = decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|e| {
            let err = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::ValidationFailed("invalid issuer".into()),
                jsonwebtoken::errors::ErrorKind::InvalidAudience => SecurityError::ValidationFailed("invalid audience".into()),
                _ => SecurityError::InvalidToken(e.to_string()),
            };
            warn!(error = %err, "JWT claim validation failed");
            err
        })?;

        Ok(token_data.claims)
    }
}

impl Validator for JwtValidator {
    async fn validate(&self, token: &str) -> Result<TokenClaims, SecurityError> {
        let claims = self.validate_claims(token).await?;
        claims_to_token_claims(&claims)
    }
}

/// Map the raw JWT claim set onto [`TokenClaims`] (§3). `tenant_id` is read
/// from a `tenant_id` claim, falling back to `tid` (a common alias); groups
/// from `groups`, scopes from a space-separated `scope` string or a
/// `scopes` array — whichever the issuer populates.
fn claims_to_token_claims(claims: &serde_json::Value) -> Result<TokenClaims, SecurityError> {
    let subject = claims.get("sub").and_then(|v| v.as_str()).ok_or_else(|| SecurityError::ValidationFailed("missing 'sub' claim".into()))?.to_string();

    let tenant_id = claims
        .get("tenant_id")
        .or_else(|| claims.get("tid"))
        .and_then(|v| v.as_str())
        .unwrap_or("default")
        .to_string();

    let email = claims.get("email").and_then(|v| v.as_str()).map(str::to_string);

    let groups = claims
        .get("groups")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let scopes = if let Some(scope_str) = claims.get("scope").and_then(|v| v.as_str()) {
        scope_str.split_whitespace().map(str::to_string).collect()
    } else {
        claims
            .get("scopes")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    let not_after = claims.get("exp").and_then(|v| v.as_i64()).ok_or_else(|| SecurityError::ValidationFailed("missing 'exp' claim".into()))?;

    Ok(TokenClaims { subject, tenant_id, email, groups, scopes, not_after })
}
