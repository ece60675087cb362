//! Synchronous Propagator (§4.4): inbound Tower middleware that parses the
//! header set and binds a per-request diagnostic [`scope::Scope`], plus an
//! outbound helper that injects it back onto outgoing `reqwest` calls.
//!
//! Grounded on `r2e-observability`'s `OtelTraceLayer`/propagation module —
//! same span-per-request shape, generalized to also carry the business
//! `StandardContext` as a task-local rather than only feeding an external
//! OTel propagator.

pub mod layer;
pub mod outbound;
pub mod scope;

pub use layer::{PropagationLayer, PropagationService};
pub use outbound::inject;
pub use scope::{bind, try_current, Scope};
