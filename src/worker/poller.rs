//! Polling loop
//!
//! One `PollingWorker` runs per enabled period. Each iteration fetches at
//! most one task and either dispatches it or decides how long to idle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

use super::dispatcher::Dispatcher;
use super::{WorkerConfig, WorkerDeps, WorkerState};
use crate::provider::{SourceError, TaskSource, TranslationInput};

/// Result of one poll iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A task was handed to the dispatcher; poll again right away
    Dispatched,
    /// A task was fetched but its input was malformed
    Dropped,
    /// Nothing to do; sleep for the given duration before the next poll
    Idle(Duration),
}

/// Keeps the shared live-worker count accurate for as long as a worker exists
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct PollingWorker {
    config: WorkerConfig,
    state: Arc<WorkerState>,
    deps: WorkerDeps,
    dispatcher: Dispatcher,
    source: Option<Arc<dyn TaskSource>>,
    _live: LiveGuard,
}

impl PollingWorker {
    /// The worker counts as live in `live` from construction until `run`
    /// returns (or the worker is dropped).
    pub fn new(
        config: WorkerConfig,
        state: Arc<WorkerState>,
        deps: WorkerDeps,
        live: Arc<AtomicUsize>,
    ) -> Self {
        let dispatcher = Dispatcher::new(deps.clone(), config.max_inflight_tasks);
        Self {
            config,
            state,
            deps,
            dispatcher,
            source: None,
            _live: LiveGuard::new(live),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Poll until the shared state is deactivated, then wait for every
    /// dispatched task to finish.
    pub async fn run(mut self) {
        info!(
            provider_id = %self.config.provider_id,
            max_inflight_tasks = self.config.max_inflight_tasks,
            idle_polling_interval_ms = self.config.idle_polling_interval.as_millis() as u64,
            "Polling worker started"
        );

        while self.state.is_active() {
            match self.poll_once().await {
                PollOutcome::Dispatched | PollOutcome::Dropped => {}
                PollOutcome::Idle(delay) => {
                    debug!(state = "idle", delay_ms = delay.as_millis() as u64);
                    if !self.state.sleep(delay).await {
                        break;
                    }
                }
            }
        }

        debug!(
            state = "stopping",
            in_flight = self.dispatcher.in_flight(),
            "Draining dispatcher"
        );
        self.dispatcher.drain().await;
        info!(state = "stopped", "Polling worker stopped");
    }

    /// Fetch at most one task and dispatch it.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let interval = self.config.idle_polling_interval;

        let source = match self.source() {
            Ok(source) => source,
            Err(e) => return self.fetch_failed(e, interval),
        };

        debug!(state = "fetching");
        let task = match source
            .next_task(&self.config.provider_id, &self.config.task_type_id)
            .await
        {
            Ok(Some(task)) => task,
            Ok(None) => return PollOutcome::Idle(interval),
            Err(e) => return self.fetch_failed(e, interval),
        };

        self.deps.metrics.task_fetched();

        let input = match TranslationInput::from_task(&task) {
            Ok(input) => input,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "Malformed task input, dropping task");
                self.deps.metrics.task_dropped();
                return PollOutcome::Dropped;
            }
        };

        debug!(state = "dispatching", task_id = %task.id);
        self.dispatcher.submit(source, task.id, input).await;
        PollOutcome::Dispatched
    }

    /// Reuse the current connection or open a new one
    fn source(&mut self) -> Result<Arc<dyn TaskSource>, SourceError> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }

        let source = self.deps.sources.connect()?;
        self.source = Some(source.clone());
        Ok(source)
    }

    fn fetch_failed(&mut self, e: SourceError, interval: Duration) -> PollOutcome {
        self.deps.metrics.fetch_error();

        if e.is_transient() {
            info!(error = %e, "Task fetch failed, retrying shortly");
            // Connection level trouble: start over with a fresh handle
            self.source = None;
            PollOutcome::Idle(interval / 2)
        } else {
            error!(error = %e, "Task fetch rejected by host");
            PollOutcome::Idle(interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceOptions;
    use crate::gateway::{InferenceEngine, PassthroughEngine, TranslationGateway};
    use crate::observability::Metrics;
    use crate::provider::{Result, Task, TaskId, TaskOutcome, TaskSourceFactory};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted fetch results, then reports an empty queue
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Option<Task>>>>,
        fetches: AtomicUsize,
        reports: Mutex<Vec<(TaskId, TaskOutcome)>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Option<Task>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn next_task(&self, _: &str, _: &str) -> Result<Option<Task>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn report_result(&self, task_id: &TaskId, outcome: &TaskOutcome) -> Result<()> {
            self.reports
                .lock()
                .unwrap()
                .push((task_id.clone(), outcome.clone()));
            Ok(())
        }
    }

    struct Factory(Arc<ScriptedSource>);

    impl TaskSourceFactory for Factory {
        fn connect(&self) -> Result<Arc<dyn TaskSource>> {
            Ok(self.0.clone())
        }
    }

    fn worker(source: Arc<ScriptedSource>) -> (PollingWorker, Arc<Metrics>, Arc<AtomicUsize>) {
        let gateway = TranslationGateway::from_engines(
            vec![Box::new(PassthroughEngine::new()) as Box<dyn InferenceEngine>],
            InferenceOptions::default(),
        )
        .unwrap();
        let metrics = Arc::new(Metrics::new());
        let deps = WorkerDeps {
            gateway: Arc::new(gateway),
            sources: Arc::new(Factory(source)),
            metrics: metrics.clone(),
        };
        let config = WorkerConfig {
            idle_polling_interval: Duration::from_secs(4),
            ..WorkerConfig::default()
        };
        let live = Arc::new(AtomicUsize::new(0));
        let worker = PollingWorker::new(config, Arc::new(WorkerState::new()), deps, live.clone());
        (worker, metrics, live)
    }

    #[tokio::test]
    async fn test_empty_queue_idles_full_interval() {
        let source = ScriptedSource::new(vec![]);
        let (mut worker, _, _) = worker(source);

        assert_eq!(worker.poll_once().await, PollOutcome::Idle(Duration::from_secs(4)));
    }

    #[tokio::test]
    async fn test_transient_error_idles_half_interval() {
        let source = ScriptedSource::new(vec![Err(SourceError::Timeout)]);
        let (mut worker, metrics, _) = worker(source);

        assert_eq!(worker.poll_once().await, PollOutcome::Idle(Duration::from_secs(2)));
        assert_eq!(metrics.snapshot().fetch_errors, 1);
    }

    #[tokio::test]
    async fn test_rejected_fetch_idles_full_interval() {
        let source = ScriptedSource::new(vec![Err(SourceError::Rejected {
            status: 401,
            message: "Unauthorized".into(),
        })]);
        let (mut worker, _, _) = worker(source);

        assert_eq!(worker.poll_once().await, PollOutcome::Idle(Duration::from_secs(4)));
    }

    #[tokio::test]
    async fn test_malformed_task_is_dropped_without_report() {
        let source = ScriptedSource::new(vec![
            Ok(Some(Task::new(1u64, json!("not an object")))),
            Ok(Some(Task::new(2u64, json!({"target_language": "es"})))),
            Ok(Some(Task::new(3u64, json!({"target_language": "", "input": "hi"})))),
        ]);
        let (mut worker, metrics, _) = worker(source.clone());

        for _ in 0..3 {
            assert_eq!(worker.poll_once().await, PollOutcome::Dropped);
        }
        worker.dispatcher().drain().await;

        assert!(source.reports.lock().unwrap().is_empty());
        assert_eq!(metrics.snapshot().tasks_dropped, 3);
    }

    #[tokio::test]
    async fn test_valid_task_is_dispatched_and_reported() {
        let source = ScriptedSource::new(vec![Ok(Some(Task::new(
            "abc",
            json!({"origin_language": "auto", "target_language": "de", "input": "Guten\nTag"}),
        )))]);
        let (mut worker, metrics, _) = worker(source.clone());

        assert_eq!(worker.poll_once().await, PollOutcome::Dispatched);
        worker.dispatcher().drain().await;

        let reports = source.reports.lock().unwrap();
        assert_eq!(
            *reports,
            vec![(TaskId::from("abc"), TaskOutcome::Output("Guten Tag".into()))]
        );
        assert_eq!(metrics.snapshot().tasks_fetched, 1);
        assert_eq!(metrics.snapshot().tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_live_count_tracks_worker() {
        let source = ScriptedSource::new(vec![]);
        let (worker, _, live) = worker(source);

        assert_eq!(live.load(Ordering::SeqCst), 1);
        // Inactive state: run returns after draining
        worker.run().await;
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}
