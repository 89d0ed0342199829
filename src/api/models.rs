//! Request and response bodies for the app's HTTP endpoints.
//!
//! The host drives the app through:
//! - `PUT /enabled?enabled=0|1`: answered with [`EnabledResponse`]
//! - `GET /heartbeat`: answered with [`HeartbeatResponse`]
//! - `POST /translate`: a [`TranslateRequest`] pushed for one task
//!
//! ```json
//! {
//!   "origin_language": "en",
//!   "target_language": "es",
//!   "text": "Hello\nworld",
//!   "task_id": 42
//! }
//! ```
//!
//! `from_language` / `to_language` are accepted as aliases.

use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;
use crate::provider::{TaskId, TranslationInput};

#[derive(Debug, Deserialize, Clone)]
pub struct TranslateRequest {
    #[serde(default, alias = "from_language")]
    pub origin_language: Option<String>,
    #[serde(alias = "to_language")]
    pub target_language: String,
    pub text: String,
    pub task_id: TaskId,
}

impl TranslateRequest {
    pub fn into_parts(self) -> (TaskId, TranslationInput) {
        let input = TranslationInput {
            origin_language: self.origin_language,
            target_language: self.target_language,
            input: self.text,
        };
        (self.task_id, input)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslateResponse {
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub struct EnabledQuery {
    pub enabled: u8,
}

/// Empty `error` means the transition succeeded
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnabledResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HeartbeatResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WorkerStatus {
    pub enabled: bool,
    pub running: bool,
    pub live_workers: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_replicas: usize,
    pub worker: WorkerStatus,
    pub metrics: MetricsSnapshot,
}
