//! Result reporting with a single retry on a fresh connection

use tracing::{error, info, warn};

use crate::observability::Metrics;
use crate::provider::{TaskId, TaskOutcome, TaskSource, TaskSourceFactory};

/// Report `outcome` for `task_id`.
///
/// A report that fails at the network level is retried exactly once with a
/// handle freshly obtained from `sources`; if that also fails, or the host
/// rejected the report outright, the task is abandoned. Returns whether
/// the host acknowledged the report. Never propagates an error.
pub async fn report_outcome(
    sources: &dyn TaskSourceFactory,
    source: &dyn TaskSource,
    task_id: &TaskId,
    outcome: &TaskOutcome,
    metrics: &Metrics,
) -> bool {
    let first_error = match source.report_result(task_id, outcome).await {
        Ok(()) => {
            info!(%task_id, success = outcome.is_success(), "Task result reported");
            return true;
        }
        Err(e) => e,
    };

    if !first_error.is_transient() {
        error!(%task_id, error = %first_error, "Host rejected task result, abandoning task");
        metrics.report_abandoned();
        return false;
    }

    warn!(%task_id, error = %first_error, "Failed to report task result, retrying with a fresh connection");

    let fresh = match sources.connect() {
        Ok(fresh) => fresh,
        Err(e) => {
            error!(%task_id, error = %e, "Could not reconnect to report task result, abandoning task");
            metrics.report_abandoned();
            return false;
        }
    };

    match fresh.report_result(task_id, outcome).await {
        Ok(()) => {
            info!(%task_id, success = outcome.is_success(), "Task result reported after retry");
            true
        }
        Err(e) => {
            error!(%task_id, error = %e, "Failed to report task result twice, abandoning task");
            metrics.report_abandoned();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Result, SourceError, Task};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` reports, then succeeds
    struct FlakySource {
        failures: usize,
        rejected: bool,
        attempts: AtomicUsize,
    }

    impl FlakySource {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                rejected: false,
                attempts: AtomicUsize::new(0),
            })
        }

        /// Fails with a 4xx rejection instead of a connection error
        fn rejecting(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                rejected: true,
                attempts: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TaskSource for FlakySource {
        async fn next_task(&self, _: &str, _: &str) -> Result<Option<Task>> {
            Ok(None)
        }

        async fn report_result(&self, _: &TaskId, _: &TaskOutcome) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt >= self.failures {
                Ok(())
            } else if self.rejected {
                Err(SourceError::Rejected {
                    status: 404,
                    message: "Not Found".into(),
                })
            } else {
                Err(SourceError::Connection("reset by peer".into()))
            }
        }
    }

    /// Always hands out the same shared source
    struct SharedFactory(Arc<FlakySource>);

    impl TaskSourceFactory for SharedFactory {
        fn connect(&self) -> Result<Arc<dyn TaskSource>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenFactory;

    impl TaskSourceFactory for BrokenFactory {
        fn connect(&self) -> Result<Arc<dyn TaskSource>> {
            Err(SourceError::Client("no tls backend".into()))
        }
    }

    fn outcome() -> TaskOutcome {
        TaskOutcome::Output("Hola".into())
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let source = FlakySource::new(0);
        let factory = SharedFactory(source.clone());
        let metrics = Metrics::new();

        let reported =
            report_outcome(&factory, source.as_ref(), &TaskId::from(1), &outcome(), &metrics).await;

        assert!(reported);
        assert_eq!(source.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_once_with_fresh_handle() {
        let source = FlakySource::new(1);
        let factory = SharedFactory(source.clone());
        let metrics = Metrics::new();

        let reported =
            report_outcome(&factory, source.as_ref(), &TaskId::from(1), &outcome(), &metrics).await;

        assert!(reported);
        assert_eq!(source.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.snapshot().reports_abandoned, 0);
    }

    #[tokio::test]
    async fn test_abandons_after_second_failure() {
        let source = FlakySource::new(10);
        let factory = SharedFactory(source.clone());
        let metrics = Metrics::new();

        let reported =
            report_outcome(&factory, source.as_ref(), &TaskId::from(1), &outcome(), &metrics).await;

        assert!(!reported);
        assert_eq!(source.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.snapshot().reports_abandoned, 1);
    }

    #[tokio::test]
    async fn test_rejected_report_is_not_retried() {
        let source = FlakySource::rejecting(1);
        let factory = SharedFactory(source.clone());
        let metrics = Metrics::new();

        let reported =
            report_outcome(&factory, source.as_ref(), &TaskId::from(1), &outcome(), &metrics).await;

        assert!(!reported);
        assert_eq!(source.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().reports_abandoned, 1);
    }

    #[tokio::test]
    async fn test_abandons_when_reconnect_fails() {
        let source = FlakySource::new(1);
        let metrics = Metrics::new();

        let reported =
            report_outcome(&BrokenFactory, source.as_ref(), &TaskId::from(1), &outcome(), &metrics)
                .await;

        assert!(!reported);
        assert_eq!(source.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().reports_abandoned, 1);
    }
}
