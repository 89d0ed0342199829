//! Tracing setup and worker counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Handle to the installed log filter
pub struct LogLevelHandle(reload::Handle<EnvFilter, Registry>);

impl LogLevelHandle {
    /// Swap in the filter for `level`. Returns false once the subscriber is gone.
    pub fn set_level(&self, level: &str) -> bool {
        self.0.reload(filter_for(level)).is_ok()
    }
}

/// `RUST_LOG` takes precedence over the configured level.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global fmt subscriber with a reloadable filter.
///
/// Returns `None` when a subscriber is already installed (tests, embedding).
pub fn init_tracing(default_level: &str) -> Option<LogLevelHandle> {
    let (filter, handle) = reload::Layer::new(filter_for(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .ok()?;

    Some(LogLevelHandle(handle))
}

/// Counters for the polling worker and dispatcher
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_fetched: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_dropped: AtomicU64,
    fetch_errors: AtomicU64,
    reports_abandoned: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_fetched(&self) {
        self.tasks_fetched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "tasks_fetched", "Metric incremented");
    }

    pub fn task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "tasks_completed", "Metric incremented");
    }

    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "tasks_failed", "Metric incremented");
    }

    pub fn task_dropped(&self) {
        self.tasks_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "tasks_dropped", "Metric incremented");
    }

    pub fn fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "fetch_errors", "Metric incremented");
    }

    pub fn report_abandoned(&self) {
        self.reports_abandoned.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "reports_abandoned", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_fetched: self.tasks_fetched.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_dropped: self.tasks_dropped.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            reports_abandoned: self.reports_abandoned.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_fetched: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_dropped: u64,
    pub fetch_errors: u64,
    pub reports_abandoned: u64,
}
