use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::gateway::TranslationGateway;
use crate::observability::Metrics;
use crate::provider::{TaskSource, TaskSourceFactory};
use crate::worker::{LifecycleController, WorkerDeps};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<TranslationGateway>,
    pub sources: Arc<dyn TaskSourceFactory>,
    /// Host connection shared by every push-style request
    pub source: Arc<dyn TaskSource>,
    pub metrics: Arc<Metrics>,
    pub lifecycle: Arc<LifecycleController>,
    pub languages: Arc<BTreeMap<String, String>>,
}

impl AppState {
    pub fn new(
        config: Config,
        deps: WorkerDeps,
        lifecycle: Arc<LifecycleController>,
        source: Arc<dyn TaskSource>,
    ) -> Self {
        let languages = Arc::new(lifecycle.descriptor().languages.clone());
        Self {
            config: Arc::new(config),
            gateway: deps.gateway,
            sources: deps.sources,
            source,
            metrics: deps.metrics,
            lifecycle,
            languages,
        }
    }
}
