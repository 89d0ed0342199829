//! Host-side collaborators
//!
//! The worker only talks to the host application through the traits in this
//! module:
//! - [`TaskSource`] hands out translation tasks and accepts their results
//! - [`TaskSourceFactory`] produces fresh task source handles (used to retry
//!   a failed result report on a new connection)
//! - [`ProviderRegistry`] registers and unregisters this app as a provider
//!
//! [`http::HostClient`] implements all three against the host's HTTP API.

pub mod http;
pub mod languages;
mod task;

pub use task::{InputError, Task, TaskId, TaskOutcome, TranslationInput};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("host returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("host rejected request with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("client setup failed: {0}")]
    Client(String),
}

impl SourceError {
    /// Network and protocol level failures worth retrying after a short pause.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Timeout
                | SourceError::Connection(_)
                | SourceError::Protocol(_)
                | SourceError::Server { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Remote task queue
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch the next pending task for the provider, if any
    async fn next_task(&self, provider_id: &str, task_type_id: &str) -> Result<Option<Task>>;

    /// Report the terminal outcome of a task
    async fn report_result(&self, task_id: &TaskId, outcome: &TaskOutcome) -> Result<()>;
}

/// Produces task source handles
pub trait TaskSourceFactory: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn TaskSource>>;
}

/// Registration record describing this provider to the host
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderDescriptor {
    /// Provider id; also the app id used to unregister
    pub id: String,
    pub name: String,
    pub task_type: String,
    /// Language code -> display name
    pub languages: BTreeMap<String, String>,
}

/// Host-side provider registry
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn register(&self, provider: &ProviderDescriptor) -> Result<()>;

    async fn unregister(&self, provider_id: &str) -> Result<()>;
}
