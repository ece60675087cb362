//! YAML + environment configuration layer and `tracing-subscriber` bootstrap
//! for the trace-and-context propagation core (§9 ambient stack).
//!
//! [`TcxConfig`] resolves the options table in §6 (`require_auth`,
//! `cache.ttl_cap_seconds`, `cache.timeout_ms`, `outbox.retention_days`,
//! `outbox.cleanup_interval_seconds`, `cdc.default_trace_flags`) from YAML
//! files overlaid with environment variables. [`logging::init_tracing`]
//! wires up structured logging without any trace-export backend, since the
//! backend and sampler are out of scope for this workspace.

mod loader;
pub mod logging;
mod settings;
mod value;

pub use logging::{init_tracing, LogFormat};
pub use settings::{TcxConfig, TcxOptions};
pub use value::{ConfigValue, FromConfigValue};

#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
