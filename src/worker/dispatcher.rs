//! Bounded dispatch of translation tasks
//!
//! Each submitted task becomes its own tokio task that translates through
//! the shared gateway and reports the outcome. A semaphore caps the number
//! of units in flight; further submissions wait for a free slot.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::WorkerDeps;
use super::report::report_outcome;
use crate::gateway::TranslationGateway;
use crate::observability::Metrics;
use crate::provider::{TaskId, TaskOutcome, TaskSource, TaskSourceFactory, TranslationInput};

#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<TranslationGateway>,
    sources: Arc<dyn TaskSourceFactory>,
    metrics: Arc<Metrics>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl Dispatcher {
    pub fn new(deps: WorkerDeps, max_inflight_tasks: usize) -> Self {
        let capacity = max_inflight_tasks.max(1);
        Self {
            gateway: deps.gateway,
            sources: deps.sources,
            metrics: deps.metrics,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of units currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Start translating `input`, waiting for a free slot first.
    ///
    /// Returns once the unit has been spawned; the outcome is reported to
    /// `source` (or a fresh handle) by the unit itself.
    pub async fn submit(&self, source: Arc<dyn TaskSource>, task_id: TaskId, input: TranslationInput) {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                // The semaphore is never closed while a dispatcher exists
                warn!(%task_id, "Dispatcher closed, task not dispatched");
                return;
            }
        };

        debug!(%task_id, in_flight = self.in_flight(), "Dispatching task");

        let gateway = self.gateway.clone();
        let sources = self.sources.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let outcome = translate_task(&gateway, &task_id, &input, &metrics).await;
            report_outcome(
                sources.as_ref(),
                source.as_ref(),
                &task_id,
                &outcome,
                &metrics,
            )
            .await;
            drop(permit);
        });
    }

    /// Wait until every dispatched unit has finished
    pub async fn drain(&self) {
        let total = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        if let Ok(all) = self.permits.acquire_many(total).await {
            drop(all);
        }
    }
}

/// Run one translation and turn its result into a task outcome
pub async fn translate_task(
    gateway: &Arc<TranslationGateway>,
    task_id: &TaskId,
    input: &TranslationInput,
    metrics: &Metrics,
) -> TaskOutcome {
    debug!(
        %task_id,
        origin_language = input.origin_language.as_deref().unwrap_or("auto"),
        target_language = %input.target_language,
        "Translating task"
    );

    match gateway
        .translate_async(&input.target_language, &input.input)
        .await
    {
        Ok(output) => {
            metrics.task_completed();
            TaskOutcome::Output(output)
        }
        Err(e) => {
            metrics.task_failed();
            warn!(%task_id, error = %e, "Translation failed, reporting task error");
            TaskOutcome::Error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceOptions;
    use crate::gateway::PassthroughEngine;
    use crate::provider::{Result, Task};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSource {
        reports: Mutex<Vec<(TaskId, TaskOutcome)>>,
    }

    #[async_trait]
    impl TaskSource for RecordingSource {
        async fn next_task(&self, _: &str, _: &str) -> Result<Option<Task>> {
            Ok(None)
        }

        async fn report_result(&self, task_id: &TaskId, outcome: &TaskOutcome) -> Result<()> {
            self.reports
                .lock()
                .unwrap()
                .push((task_id.clone(), outcome.clone()));
            Ok(())
        }
    }

    struct Factory(Arc<RecordingSource>);

    impl TaskSourceFactory for Factory {
        fn connect(&self) -> Result<Arc<dyn TaskSource>> {
            Ok(self.0.clone())
        }
    }

    fn deps(source: Arc<RecordingSource>) -> WorkerDeps {
        let gateway = TranslationGateway::from_engines(
            vec![Box::new(PassthroughEngine::new()) as Box<dyn crate::gateway::InferenceEngine>],
            InferenceOptions::default(),
        )
        .unwrap();

        WorkerDeps {
            gateway: Arc::new(gateway),
            sources: Arc::new(Factory(source)),
            metrics: Arc::new(Metrics::new()),
        }
    }

    fn input(text: &str) -> TranslationInput {
        serde_json::from_value(json!({"target_language": "es", "input": text})).unwrap()
    }

    #[tokio::test]
    async fn test_submit_reports_each_task_once() {
        let source = Arc::new(RecordingSource::default());
        let dispatcher = Dispatcher::new(deps(source.clone()), 2);

        for id in 0..5u64 {
            dispatcher
                .submit(source.clone(), TaskId::from(id), input(&format!("text\n{id}")))
                .await;
        }
        dispatcher.drain().await;

        let reports = source.reports.lock().unwrap();
        assert_eq!(reports.len(), 5);
        for id in 0..5u64 {
            let matching: Vec<_> = reports
                .iter()
                .filter(|(task_id, _)| *task_id == TaskId::from(id))
                .collect();
            assert_eq!(matching.len(), 1);
            assert_eq!(matching[0].1, TaskOutcome::Output(format!("text {id}")));
        }
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_on_idle_dispatcher_returns() {
        let source = Arc::new(RecordingSource::default());
        let dispatcher = Dispatcher::new(deps(source), 3);

        dispatcher.drain().await;
        assert_eq!(dispatcher.capacity(), 3);
        assert_eq!(dispatcher.in_flight(), 0);
    }
}
