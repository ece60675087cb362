//! Gateway Context Establisher (§4.3): resolves the inbound bearer token
//! into [`tcx_core::TokenClaims`] (via the context store, falling through
//! to a [`tcx_security::Validator`] on a miss), enriches with request-scoped
//! fields, and exposes the result both as an axum extension and as the
//! active [`tcx_propagation::Scope`].

pub mod establish;
pub mod layer;
pub mod transaction_type;

pub use establish::{establish as establish_context, Established};
pub use layer::{GatewayLayer, GatewayService};
