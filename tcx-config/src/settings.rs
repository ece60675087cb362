use std::collections::HashMap;
use std::path::Path;

use crate::loader;
use crate::value::{ConfigValue, FromConfigValue};
use crate::ConfigError;

/// Application configuration loaded from YAML files, `.env` files, and
/// environment variables (§9).
///
/// Resolution order (lowest to highest priority):
/// 1. `tcx.yaml` (base)
/// 2. `tcx-{profile}.yaml` (profile override)
/// 3. `.env` / `.env.{profile}` (loaded into process environment, never
///    overwriting an already-set variable)
/// 4. Environment variables (`TCX_CACHE_TTL_CAP_SECONDS` overrides
///    `cache.ttl_cap_seconds`)
///
/// Profile is `TCX_PROFILE` env var, else the argument to [`TcxConfig::load`],
/// else `"dev"`.
#[derive(Debug, Clone)]
pub struct TcxConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl TcxConfig {
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        let active_profile = std::env::var("TCX_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(Path::new("tcx.yaml"), &mut values)?;
        loader::load_yaml_file(Path::new(&format!("tcx-{active_profile}.yaml")), &mut values)?;

        let _ = dotenvy::dotenv();
        let _ = dotenvy::from_filename(format!(".env.{active_profile}"));

        for (env_key, env_val) in std::env::vars() {
            let Some(rest) = env_key.strip_prefix("TCX_") else { continue };
            let config_key = rest.to_lowercase().replace('_', ".");
            values.insert(config_key, ConfigValue::String(env_val));
        }

        Ok(TcxConfig { values, profile: active_profile })
    }

    /// Build directly from a YAML string — tests and examples only.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(TcxConfig { values, profile: "test".to_string() })
    }

    pub fn empty() -> Self {
        TcxConfig { values: HashMap::new(), profile: "test".to_string() }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self.values.get(key).ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Collapse the full options table (§6) into one typed, defaulted value.
    pub fn options(&self) -> TcxOptions {
        TcxOptions {
            require_auth: self.get_or("require_auth", false),
            cache_ttl_cap_seconds: self.get_or("cache.ttl_cap_seconds", 900),
            cache_timeout_ms: self.get_or("cache.timeout_ms", 200),
            outbox_retention_days: self.get_or("outbox.retention_days", 7),
            outbox_cleanup_interval_seconds: self.get_or("outbox.cleanup_interval_seconds", 3600),
            cdc_default_trace_flags: self.get_or("cdc.default_trace_flags", "01".to_string()),
        }
    }
}

/// The full option set named in §6, with the spec's stated defaults. Every
/// collaborator that needs a knob reads it from here rather than parsing
/// `TcxConfig` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcxOptions {
    /// When `true`, requests without a resolvable bearer token are rejected
    /// (401) rather than treated as anonymous (§4.3 step 2, §7).
    pub require_auth: bool,
    /// Upper bound on how long a cached claims entry may live, independent
    /// of the token's own expiry (§4.2).
    pub cache_ttl_cap_seconds: i64,
    /// Budget for a single context-store round trip before it is treated as
    /// a soft failure (§4.2, §7 `ContextStoreFailure`).
    pub cache_timeout_ms: i64,
    /// How long a `PROCESSED` outbox row is kept before cleanup deletes it.
    pub outbox_retention_days: i64,
    /// Interval between cleanup task runs.
    pub outbox_cleanup_interval_seconds: i64,
    /// `trace_flags` value used by the CDC projector when a row has trace
    /// ids but no flags column (legacy rows, §4.6).
    pub cdc_default_trace_flags: String,
}

impl Default for TcxOptions {
    fn default() -> Self {
        TcxConfig::empty().options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_config_is_empty() {
        let opts = TcxConfig::empty().options();
        assert!(!opts.require_auth);
        assert_eq!(opts.cache_ttl_cap_seconds, 900);
        assert_eq!(opts.cache_timeout_ms, 200);
        assert_eq!(opts.outbox_retention_days, 7);
        assert_eq!(opts.cdc_default_trace_flags, "01");
    }

    #[test]
    fn yaml_values_override_defaults() {
        let cfg = TcxConfig::from_yaml_str(
            "require_auth: true\ncache:\n  ttl_cap_seconds: 60\n  timeout_ms: 50\n",
        )
        .unwrap();
        let opts = cfg.options();
        assert!(opts.require_auth);
        assert_eq!(opts.cache_ttl_cap_seconds, 60);
        assert_eq!(opts.cache_timeout_ms, 50);
        // keys absent from the override still fall back to defaults
        assert_eq!(opts.outbox_retention_days, 7);
    }

    #[test]
    fn missing_key_error_is_not_found() {
        let cfg = TcxConfig::empty();
        let err = cfg.get::<String>("nope").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn env_override_takes_precedence_over_yaml() {
        // TCX_PROFILE / TCX_* env overlay happens only in `load`, not
        // `from_yaml_str` — exercised here via the public `get` path with a
        // manually inserted override to keep the test hermetic (no process
        // env mutation across parallel test threads).
        let mut cfg = TcxConfig::from_yaml_str("cache:\n  timeout_ms: 50\n").unwrap();
        cfg.values.insert("cache.timeout_ms".to_string(), ConfigValue::Integer(900));
        assert_eq!(cfg.get::<i64>("cache.timeout_ms").unwrap(), 900);
    }
}
