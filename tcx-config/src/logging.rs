//! `tracing-subscriber` bootstrap (§9 ambient stack).
//!
//! Grounded on the console half of the teacher's `init_tracing` — fmt layer
//! plus `EnvFilter` — with the OTLP exporter stage dropped: the trace
//! backend and sampler are explicitly out of scope (§1 Non-goals), so this
//! crate only ever emits spans and structured log lines, never exports them.
//! Downstream services that do want export wrap the same spans with their
//! own `tracing-opentelemetry` layer; this crate doesn't need to know.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global `tracing` subscriber. Call once at process start;
/// panics if a subscriber is already installed (mirrors `tracing_subscriber`'s
/// own behavior and surfaces misuse immediately rather than silently).
pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);
            Registry::default().with(env_filter).with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);
            Registry::default().with(env_filter).with(fmt_layer).init();
        }
    }
}
