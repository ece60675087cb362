//! Broker-agnostic publish abstraction and bounded batch dispatch (§4.6
//! step 7), grounded on the same acquire-before-spawn backpressure shape an
//! in-process event bus uses to cap concurrent handlers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::warn;

use tcx_core::BrokerMessage;

use crate::project::ProjectedMessage;

#[derive(Debug)]
pub struct PublishError(pub String);

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broker publish error: {}", self.0)
    }
}

impl std::error::Error for PublishError {}

/// A broker write, abstracted so this crate stays broker-agnostic. Boxed
/// futures rather than RPITIT: callers hold this behind `Arc<dyn Publisher>`.
pub trait Publisher: Send + Sync {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        message: BrokerMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'a>>;
}

/// Outcome of one message's publish attempt, for the reconciler to act on.
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, PublishError)>,
}

/// Publish every projected message concurrently, bounded by `max_concurrent`
/// in-flight publishes so a slow or backed-up broker can't let an unbounded
/// number of tasks pile up. Returns which message keys succeeded and which
/// failed (for dead-lettering); never panics on an individual publish error.
pub async fn publish_batch(
    publisher: Arc<dyn Publisher>,
    messages: Vec<ProjectedMessage>,
    max_concurrent: usize,
) -> BatchOutcome {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = Vec::with_capacity(messages.len());

    for projected in messages {
        let publisher = publisher.clone();
        let semaphore = semaphore.clone();
        tasks.push(tokio::spawn(async move {
            let key = projected.message.key.clone();
            let permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = publisher.publish(projected.topic, projected.message).await;
            drop(permit);
            (key, result)
        }));
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for task in tasks {
        match task.await {
            Ok((key, Ok(()))) => succeeded.push(key),
            Ok((key, Err(err))) => {
                warn!(key, error = %err, "broker publish failed, row left for dead-letter handling");
                failed.push((key, err));
            }
            Err(join_err) => warn!(error = %join_err, "publish task panicked"),
        }
    }

    BatchOutcome { succeeded, failed }
}
