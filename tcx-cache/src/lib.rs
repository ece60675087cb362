//! TTL-bound, fingerprint-keyed context store (§4.2).
//!
//! A soft dependency: every lookup goes through [`get_with_timeout`] /
//! [`set_with_timeout`], and any failure — timeout, backend error — is a
//! cache miss rather than a request failure. Keys are SHA-256 fingerprints
//! of the bearer token ([`fingerprint`]), never the token itself.

mod fingerprint;
mod store;

pub use fingerprint::fingerprint;
pub use store::{
    context_store, get_with_timeout, set_context_store, set_with_timeout, ContextStore,
    InMemoryContextStore,
};
