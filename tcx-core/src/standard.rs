//! `StandardContext` — the business/correlation context (§3).
//!
//! Immutable once constructed for a request: every "update" below produces
//! a new instance rather than mutating in place.

use serde::{Deserialize, Serialize};

/// Fields are capped at this many bytes each, per §3.
pub const MAX_FIELD_BYTES: usize = 256;

/// Truncate a string to the field byte cap at a UTF-8 boundary.
pub fn clamp_field(value: &str) -> String {
    if value.len() <= MAX_FIELD_BYTES {
        return value.to_string();
    }
    let mut end = MAX_FIELD_BYTES;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// The business context carried alongside the W3C trace context on every
/// hop: tenant, user, request, service, and transaction identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardContext {
    pub tenant_id: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_groups: Vec<String>,
    pub request_id: String,
    pub correlation_id: String,
    pub service_name: String,
    pub transaction_type: String,
    pub origin_service: Option<String>,
}

impl StandardContext {
    pub const DEFAULT_TENANT: &'static str = "default";
    pub const DEFAULT_USER: &'static str = "anonymous";

    /// Build an anonymous context for requests without a bearer token, or
    /// with `require_auth = false` and a failed/absent token.
    pub fn anonymous(
        request_id: impl Into<String>,
        correlation_id: impl Into<String>,
        service_name: impl Into<String>,
        transaction_type: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: "public".to_string(),
            user_id: Self::DEFAULT_USER.to_string(),
            user_email: None,
            user_groups: Vec::new(),
            request_id: clamp_field(&request_id.into()),
            correlation_id: clamp_field(&correlation_id.into()),
            service_name: clamp_field(&service_name.into()),
            transaction_type: clamp_field(&transaction_type.into()),
            origin_service: None,
        }
    }

    /// Build a synthetic context for a scheduled job (§4.7 last paragraph).
    pub fn for_scheduled_job(
        request_id: impl Into<String>,
        service_name: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: "system".to_string(),
            user_id: "system-scheduler".to_string(),
            user_email: None,
            user_groups: Vec::new(),
            request_id: clamp_field(&request_id.into()),
            correlation_id: clamp_field(&request_id.into()),
            service_name: clamp_field(&service_name.into()),
            transaction_type: clamp_field(&job_name.into()),
            origin_service: None,
        }
    }

    pub fn builder() -> StandardContextBuilder {
        StandardContextBuilder::default()
    }

    /// Every field clamped to `MAX_FIELD_BYTES`. Used once at construction;
    /// the record is immutable afterward.
    fn clamped(mut self) -> Self {
        self.tenant_id = clamp_field(&self.tenant_id);
        self.user_id = clamp_field(&self.user_id);
        self.user_email = self.user_email.map(|e| clamp_field(&e));
        self.user_groups = self.user_groups.iter().map(|g| clamp_field(g)).collect();
        self.request_id = clamp_field(&self.request_id);
        self.correlation_id = clamp_field(&self.correlation_id);
        self.service_name = clamp_field(&self.service_name);
        self.transaction_type = clamp_field(&self.transaction_type);
        self.origin_service = self.origin_service.map(|o| clamp_field(&o));
        self
    }
}

/// Builder used by the Gateway Establisher to assemble a `StandardContext`
/// from token claims plus request-scoped fields.
#[derive(Debug, Default, Clone)]
pub struct StandardContextBuilder {
    tenant_id: Option<String>,
    user_id: Option<String>,
    user_email: Option<String>,
    user_groups: Vec<String>,
    request_id: Option<String>,
    correlation_id: Option<String>,
    service_name: Option<String>,
    transaction_type: Option<String>,
    origin_service: Option<String>,
}

impl StandardContextBuilder {
    pub fn tenant_id(mut self, v: impl Into<String>) -> Self {
        self.tenant_id = Some(v.into());
        self
    }
    pub fn user_id(mut self, v: impl Into<String>) -> Self {
        self.user_id = Some(v.into());
        self
    }
    pub fn user_email(mut self, v: Option<String>) -> Self {
        self.user_email = v;
        self
    }
    pub fn user_groups(mut self, v: Vec<String>) -> Self {
        self.user_groups = v;
        self
    }
    pub fn request_id(mut self, v: impl Into<String>) -> Self {
        self.request_id = Some(v.into());
        self
    }
    pub fn correlation_id(mut self, v: impl Into<String>) -> Self {
        self.correlation_id = Some(v.into());
        self
    }
    pub fn service_name(mut self, v: impl Into<String>) -> Self {
        self.service_name = Some(v.into());
        self
    }
    pub fn transaction_type(mut self, v: impl Into<String>) -> Self {
        self.transaction_type = Some(v.into());
        self
    }
    pub fn origin_service(mut self, v: Option<String>) -> Self {
        self.origin_service = v;
        self
    }

    pub fn build(self) -> StandardContext {
        StandardContext {
            tenant_id: self.tenant_id.unwrap_or_else(|| StandardContext::DEFAULT_TENANT.to_string()),
            user_id: self.user_id.unwrap_or_else(|| StandardContext::DEFAULT_USER.to_string()),
            user_email: self.user_email,
            user_groups: self.user_groups,
            request_id: self.request_id.unwrap_or_default(),
            correlation_id: self.correlation_id.unwrap_or_default(),
            service_name: self.service_name.unwrap_or_default(),
            transaction_type: self.transaction_type.unwrap_or_default(),
            origin_service: self.origin_service,
        }
        .clamped()
    }
}

/// Parsed principal description returned by a `Validator`. Opaque to the
/// core beyond these fields (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub subject: String,
    pub tenant_id: String,
    pub email: Option<String>,
    pub groups: Vec<String>,
    pub scopes: Vec<String>,
    /// Absolute expiry, unix seconds.
    pub not_after: i64,
}

impl TokenClaims {
    /// Seconds remaining until expiry, floored at 0.
    pub fn seconds_until_expiry(&self, now_unix: i64) -> i64 {
        (self.not_after - now_unix).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_has_expected_defaults() {
        let ctx = StandardContext::anonymous("req-1", "corr-1", "gateway", "GET-links");
        assert_eq!(ctx.user_id, "anonymous");
        assert_eq!(ctx.tenant_id, "public");
        assert!(ctx.user_groups.is_empty());
    }

    #[test]
    fn scheduled_job_context_has_system_identity() {
        let ctx = StandardContext::for_scheduled_job("job-1", "link-svc", "expire-links");
        assert_eq!(ctx.user_id, "system-scheduler");
        assert_eq!(ctx.tenant_id, "system");
        assert_eq!(ctx.transaction_type, "expire-links");
    }

    #[test]
    fn fields_are_clamped_to_max_bytes() {
        let long = "x".repeat(MAX_FIELD_BYTES + 50);
        let ctx = StandardContext::builder()
            .tenant_id(long.clone())
            .user_id("u")
            .request_id("r")
            .correlation_id("c")
            .service_name("s")
            .transaction_type("t")
            .build();
        assert_eq!(ctx.tenant_id.len(), MAX_FIELD_BYTES);
    }

    #[test]
    fn seconds_until_expiry_floors_at_zero() {
        let claims = TokenClaims {
            subject: "u".into(),
            tenant_id: "t".into(),
            email: None,
            groups: vec![],
            scopes: vec![],
            not_after: 100,
        };
        assert_eq!(claims.seconds_until_expiry(200), 0);
        assert_eq!(claims.seconds_until_expiry(50), 50);
    }
}
