//! Enable/disable handling for the polling worker

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};

use super::poller::PollingWorker;
use super::{WorkerConfig, WorkerDeps, WorkerState};
use crate::provider::{ProviderDescriptor, ProviderRegistry, SourceError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Provider registration failed: {0}")]
    Registration(#[source] SourceError),
}

struct WorkerHandle {
    generation: u64,
    join: JoinHandle<()>,
}

/// Owns the single polling worker slot.
///
/// Every transition holds the slot lock, so two enable notifications can
/// never both spawn a worker.
pub struct LifecycleController {
    config: WorkerConfig,
    deps: WorkerDeps,
    registry: Arc<dyn ProviderRegistry>,
    descriptor: ProviderDescriptor,
    state: Arc<WorkerState>,
    slot: Mutex<Option<WorkerHandle>>,
    generation: AtomicU64,
    live: Arc<AtomicUsize>,
}

impl LifecycleController {
    pub fn new(
        config: WorkerConfig,
        deps: WorkerDeps,
        registry: Arc<dyn ProviderRegistry>,
        descriptor: ProviderDescriptor,
    ) -> Self {
        Self {
            config,
            deps,
            registry,
            descriptor,
            state: Arc::new(WorkerState::new()),
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    /// Number of polling loops currently alive
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.state.is_active() && self.live_workers() > 0
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    /// Apply an enabled/disabled notification from the host.
    ///
    /// Enabling registers the provider and makes sure exactly one worker
    /// polls. A registration failure is returned, but the worker is started
    /// regardless. Disabling never fails and does not wait for in-flight
    /// tasks.
    pub async fn on_enabled_changed(&self, enabled: bool) -> Result<(), LifecycleError> {
        if enabled {
            self.enable().await
        } else {
            self.disable().await;
            Ok(())
        }
    }

    async fn enable(&self) -> Result<(), LifecycleError> {
        let mut slot = self.slot.lock().await;

        let registration = self.registry.register(&self.descriptor).await;
        match &registration {
            Ok(()) => info!(provider_id = %self.descriptor.id, "Provider registered"),
            Err(e) => error!(provider_id = %self.descriptor.id, error = %e, "Provider registration failed"),
        }

        let running = slot.as_ref().is_some_and(|h| !h.join.is_finished());
        if running && self.state.is_active() {
            info!("Polling worker already running");
            return registration.map_err(LifecycleError::Registration);
        }

        if let Some(previous) = slot.take() {
            info!(generation = previous.generation, "Waiting for previous worker to drain");
            if let Err(e) = previous.join.await {
                warn!(generation = previous.generation, error = %e, "Previous worker ended abnormally");
            }
        }

        self.state.activate();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let worker = PollingWorker::new(
            self.config.clone(),
            self.state.clone(),
            self.deps.clone(),
            self.live.clone(),
        );
        let join = tokio::spawn(
            worker
                .run()
                .instrument(info_span!("polling_worker", generation)),
        );
        *slot = Some(WorkerHandle { generation, join });

        info!(generation, "Polling worker spawned");
        registration.map_err(LifecycleError::Registration)
    }

    async fn disable(&self) {
        let slot = self.slot.lock().await;

        if self.state.deactivate() {
            let generation = slot.as_ref().map(|h| h.generation);
            info!(?generation, "Polling worker stopping");
        }

        if let Err(e) = self.registry.unregister(&self.descriptor.id).await {
            warn!(provider_id = %self.descriptor.id, error = %e, "Provider unregistration failed");
        }
    }

    /// Stop the worker and wait for it to drain
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        self.state.deactivate();

        if let Some(handle) = slot.take() {
            info!(generation = handle.generation, "Waiting for polling worker to drain");
            if let Err(e) = handle.join.await {
                warn!(generation = handle.generation, error = %e, "Polling worker ended abnormally");
            }
        }
    }
}
