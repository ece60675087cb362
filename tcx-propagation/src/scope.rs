//! The request-scoped diagnostic scope (§4.4, §5).
//!
//! Bound by [`crate::layer::PropagationLayer`] for the lifetime of the
//! request and read by every log statement and outbound call in between.
//! Implemented as a `tokio::task_local!` rather than a thread-local: this
//! workspace runs on cooperative (single-thread-per-poll) async, so the
//! scope must travel with the task across `.await` points, not the OS
//! thread (§4.4 "Reactive/async contexts").

use tcx_core::{StandardContext, TraceContext};

/// Everything a log line or outbound call needs: the business context, the
/// trace context it arrived (or was started) with, and which inbound
/// fields were discarded as malformed (surfaced as `context.malformed`).
#[derive(Debug, Clone)]
pub struct Scope {
    pub standard: StandardContext,
    pub trace: TraceContext,
    pub malformed: Vec<&'static str>,
}

tokio::task_local! {
    static CURRENT_SCOPE: Scope;
}

/// Run `fut` with `scope` bound as the current diagnostic scope. Nesting is
/// allowed — an inner call (e.g. the Gateway Establisher refining the
/// anonymous context into an authenticated one) shadows the outer scope for
/// its remaining lifetime and the original is restored when it returns.
///
/// Because this only ever wraps a future, the scope is released on every
/// exit path — normal return, early `?`, or panic unwind — without any
/// separate guard object (P6).
pub async fn bind<F: std::future::Future>(scope: Scope, fut: F) -> F::Output {
    CURRENT_SCOPE.scope(scope, fut).await
}

/// The current scope, if called from within [`bind`]. `None` outside any
/// bound request — e.g. in unit tests that don't go through the layer.
pub fn try_current() -> Option<Scope> {
    CURRENT_SCOPE.try_with(|s| s.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scope() -> Scope {
        Scope {
            standard: StandardContext::anonymous("r", "c", "svc", "GET-x"),
            trace: TraceContext::new_root("a".repeat(32), "b".repeat(16)),
            malformed: vec![],
        }
    }

    #[tokio::test]
    async fn current_is_none_outside_bind() {
        assert!(try_current().is_none());
    }

    #[tokio::test]
    async fn current_is_some_inside_bind() {
        bind(sample_scope(), async {
            assert!(try_current().is_some());
        })
        .await;
    }

    #[tokio::test]
    async fn nested_bind_shadows_and_restores() {
        let outer = sample_scope();
        let mut inner = sample_scope();
        inner.standard = StandardContext::anonymous("r2", "c2", "svc", "POST-y");

        bind(outer.clone(), async {
            assert_eq!(try_current().unwrap().standard.request_id, "r");
            bind(inner.clone(), async {
                assert_eq!(try_current().unwrap().standard.request_id, "r2");
            })
            .await;
            assert_eq!(try_current().unwrap().standard.request_id, "r");
        })
        .await;
    }

    #[tokio::test]
    async fn scope_is_released_after_panicking_task_unwinds() {
        // A panic inside `bind` unwinds through the task-local `scope()`
        // wrapper, which drops its guard like any other stack frame — no
        // separate cleanup step is needed. Exercised via a spawned task so
        // the panic doesn't tear down the test's own task.
        let handle = tokio::spawn(bind(sample_scope(), async { panic!("boom") }));
        assert!(handle.await.is_err());
        assert!(try_current().is_none());
    }
}
