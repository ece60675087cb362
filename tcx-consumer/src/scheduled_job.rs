//! Scheduled-job context glue (§4.7 last paragraph).
//!
//! Trimmed down from a plugin-registered, DI-injected scheduler: this is a
//! plain `CancellationToken`-driven interval loop a library crate can own
//! without a controller-registration layer behind it. Each tick synthesizes
//! the `system-scheduler`/`system` context, wraps the run in a root span,
//! and binds the scope exactly as an inbound request or consumed message
//! would, so anything the job calls (e.g. the Transactional Outbox) sees a
//! context indistinguishable from a real caller's.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tcx_core::{StandardContext, TraceContext};
use tcx_propagation::{bind, Scope};

/// Run `job` on every tick of `interval` until `token` is cancelled.
/// `job_name` becomes `transaction_type` on the synthesized context and the
/// scheduled-job span's name.
pub async fn run_scheduled_job<F, Fut>(
    job_name: &str,
    service_name: &str,
    interval: Duration,
    token: CancellationToken,
    mut job: F,
) where
    F: FnMut(StandardContext) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        if token.is_cancelled() {
            tracing::info!(job = job_name, "scheduled job loop cancelled");
            return;
        }
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!(job = job_name, "scheduled job loop cancelled");
                return;
            }
            _ = ticker.tick() => {
                run_once(job_name, service_name, &mut job).await;
            }
        }
    }
}

/// Execute `job` a single time under a synthesized system context. Exposed
/// separately from [`run_scheduled_job`] so one-shot invocations (e.g. an
/// admin-triggered run) get identical context behavior to a ticked one.
pub async fn run_once<F, Fut>(job_name: &str, service_name: &str, job: &mut F)
where
    F: FnMut(StandardContext) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let request_id = new_hex_id(32);
    let ctx = StandardContext::for_scheduled_job(&request_id, service_name, job_name);
    let trace = TraceContext::new_root(new_hex_id(32), new_hex_id(16));

    let span = tracing::info_span!(
        "scheduled.job",
        job = job_name,
        tenant.id = %ctx.tenant_id,
        user.id = %ctx.user_id,
        transaction.type = %ctx.transaction_type,
    );
    let scope = Scope { standard: ctx.clone(), trace, malformed: vec![] };

    let _entered = span.enter();
    bind(scope, job(ctx)).await
}

fn new_hex_id(hex_len: usize) -> String {
    uuid::Uuid::new_v4().simple().to_string()[..hex_len].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn run_once_synthesizes_system_scheduler_identity() {
        let mut seen = None;
        run_once("expire-links", "link-svc", &mut |ctx| {
            seen = Some((ctx.tenant_id.clone(), ctx.user_id.clone(), ctx.transaction_type.clone()));
            async {}
        })
        .await;
        let (tenant, user, txn) = seen.unwrap();
        assert_eq!(tenant, "system");
        assert_eq!(user, "system-scheduler");
        assert_eq!(txn, "expire-links");
    }

    #[tokio::test]
    async fn scope_is_bound_during_job_execution_and_released_after() {
        let bound_during = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = bound_during.clone();
        run_once("noop-job", "link-svc", &mut |_ctx| {
            let flag = flag.clone();
            async move {
                flag.store(tcx_propagation::try_current().is_some(), Ordering::SeqCst);
            }
        })
        .await;
        assert!(bound_during.load(Ordering::SeqCst));
        assert!(tcx_propagation::try_current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_never_runs_job_when_cancelled_before_first_tick() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        run_scheduled_job("tick-job", "link-svc", Duration::from_secs(60), token, |_ctx| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
