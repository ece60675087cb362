//! Canonical context model and wire codecs for the trace-and-context
//! propagation core.
//!
//! This crate has no I/O of its own — it defines the shapes
//! ([`TraceContext`], [`StandardContext`], [`TokenClaims`]) and the pure
//! conversions between them and their three on-wire forms (HTTP headers,
//! outbox-row columns, broker-message headers). Every other crate in the
//! workspace builds on these types rather than reinventing them.

pub mod broker;
pub mod error;
pub mod headers;
pub mod outbox_row;
pub mod standard;
pub mod trace;

pub use broker::BrokerMessage;
pub use error::CoreError;
pub use outbox_row::OutboxContextColumns;
pub use standard::{StandardContext, StandardContextBuilder, TokenClaims};
pub use trace::TraceContext;
