//! Translation worker
//!
//! A [`lifecycle::LifecycleController`] owns at most one polling worker at a
//! time. The worker repeatedly asks the host for a task, validates it and
//! hands it to the [`dispatcher::Dispatcher`], which runs at most
//! `max_inflight_tasks` translations concurrently and reports each outcome
//! back to the host.
//!
//! ```text
//! enable -> LifecycleController -> PollingWorker --next_task--> TaskSource
//!                                        |
//!                                        v
//!                                   Dispatcher (semaphore, N permits)
//!                                        |
//!                                        v
//!                              TranslationGateway -> report_result
//! ```

pub mod dispatcher;
pub mod lifecycle;
pub mod poller;
pub mod report;

pub use dispatcher::Dispatcher;
pub use lifecycle::{LifecycleController, LifecycleError};
pub use poller::{PollOutcome, PollingWorker};

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::config::Config;
use crate::gateway::TranslationGateway;
use crate::observability::Metrics;
use crate::provider::TaskSourceFactory;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub provider_id: String,
    pub task_type_id: String,
    pub idle_polling_interval: Duration,
    pub max_inflight_tasks: usize,
}

impl WorkerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider_id: config.provider.id.clone(),
            task_type_id: config.provider.task_type_id.clone(),
            idle_polling_interval: config.worker.idle_interval(),
            max_inflight_tasks: config.worker.max_inflight_tasks.max(1),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            provider_id: "translate2".to_string(),
            task_type_id: "core:text2text:translate".to_string(),
            idle_polling_interval: Duration::from_secs(5),
            max_inflight_tasks: 4,
        }
    }
}

/// Collaborators shared by every worker generation
#[derive(Clone)]
pub struct WorkerDeps {
    pub gateway: Arc<TranslationGateway>,
    pub sources: Arc<dyn TaskSourceFactory>,
    pub metrics: Arc<Metrics>,
}

/// Enabled flag shared between the control surface and the polling loop.
///
/// Only the lifecycle controller writes it.
#[derive(Debug, Default)]
pub struct WorkerState {
    active: AtomicBool,
    wake: Notify,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns `true` if the state was inactive before
    pub fn activate(&self) -> bool {
        !self.active.swap(true, Ordering::SeqCst)
    }

    /// Clears the flag and wakes a sleeping worker.
    /// Returns `true` if the state was active before.
    pub fn deactivate(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.wake.notify_waiters();
        was_active
    }

    /// Sleep for `duration` unless the state is deactivated first.
    ///
    /// Returns `false` when woken by deactivation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut notified = pin!(self.wake.notified());
        notified.as_mut().enable();

        if !self.is_active() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = notified => false,
        }
    }
}
