//! CDC Header Projector (§4.6): a stateless transform from a captured
//! outbox row envelope to a broker-ready message, plus a broker-agnostic
//! publish abstraction for the reconciler that marks rows processed.

pub mod envelope;
pub mod project;
pub mod publish;
pub mod routing;

pub use envelope::CdcEnvelope;
pub use project::{project, ProjectedMessage};
pub use publish::{publish_batch, BatchOutcome, PublishError, Publisher};
