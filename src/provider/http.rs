//! HTTP client for the host application's task processing API

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, IntoUrl, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::{
    ProviderDescriptor, ProviderRegistry, Result, SourceError, Task, TaskId, TaskOutcome,
    TaskSource, TaskSourceFactory,
};
use crate::config::HostConfig;

const NEXT_TASK_PATH: &str = "/ocs/v2.php/taskprocessing/tasks_provider/next";
const RESULT_PATH_PREFIX: &str = "/ocs/v2.php/taskprocessing/tasks_provider";
const PROVIDER_PATH: &str = "/ocs/v1.php/apps/app_api/api/v1/ai_provider/task_processing";

#[derive(Debug, Deserialize)]
struct OcsEnvelope<T> {
    ocs: OcsBody<T>,
}

#[derive(Debug, Deserialize)]
struct OcsBody<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct NextTaskData {
    #[serde(default)]
    task: Option<Task>,
}

/// Client for the host's task queue and provider registry
pub struct HostClient {
    client: Client,
    config: HostConfig,
}

impl HostClient {
    /// Create a new host client
    pub fn new(config: HostConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(format!("transbox/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `{RESULT_PATH_PREFIX}/{task_id}/result` with the id percent-encoded
    fn result_url(&self, task_id: &TaskId) -> Result<Url> {
        let mut url = Url::parse(&self.url(RESULT_PATH_PREFIX))
            .map_err(|e| SourceError::Client(format!("invalid base url: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| SourceError::Client("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(&task_id.to_string())
            .push("result");

        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_to(method, self.url(path))
    }

    /// Request with the app authentication headers the host expects
    fn request_to<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        let credentials = format!(
            "{}:{}",
            self.config.user,
            self.config.app_secret.as_deref().unwrap_or_default()
        );

        self.client
            .request(method, url)
            .header("OCS-APIRequest", "true")
            .header("EX-APP-ID", &self.config.app_id)
            .header("EX-APP-VERSION", &self.config.app_version)
            .header("AUTHORIZATION-APP-API", BASE64.encode(credentials))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = status.canonical_reason().unwrap_or("Unknown").to_string();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(SourceError::Server {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(SourceError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn read_ocs<T: DeserializeOwned>(response: Response) -> Result<T> {
        let envelope: OcsEnvelope<T> = response
            .json()
            .await
            .map_err(|e| SourceError::Protocol(format!("invalid response body: {}", e)))?;
        Ok(envelope.ocs.data)
    }
}

fn map_transport_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else if e.is_connect() || e.is_request() {
        SourceError::Connection(e.to_string())
    } else if e.is_builder() {
        SourceError::Client(e.to_string())
    } else {
        SourceError::Protocol(e.to_string())
    }
}

/// Body the host expects for a task result
pub fn outcome_body(outcome: &TaskOutcome) -> Value {
    match outcome {
        TaskOutcome::Output(text) => json!({ "output": { "output": text } }),
        TaskOutcome::Error(message) => json!({ "errorMessage": message }),
    }
}

#[async_trait]
impl TaskSource for HostClient {
    async fn next_task(&self, provider_id: &str, task_type_id: &str) -> Result<Option<Task>> {
        let request = self
            .request(Method::GET, NEXT_TASK_PATH)
            .query(&[("providerIds[]", provider_id), ("taskTypeIds[]", task_type_id)]);

        let response = self.send(request).await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let data: Option<NextTaskData> = Self::read_ocs(response).await?;
        let task = data.and_then(|data| data.task);
        if let Some(task) = &task {
            debug!(task_id = %task.id, "Fetched task");
        }

        Ok(task)
    }

    async fn report_result(&self, task_id: &TaskId, outcome: &TaskOutcome) -> Result<()> {
        let request = self
            .request_to(Method::POST, self.result_url(task_id)?)
            .json(&outcome_body(outcome));

        self.send(request).await?;
        debug!(%task_id, success = outcome.is_success(), "Result reported");
        Ok(())
    }
}

#[async_trait]
impl ProviderRegistry for HostClient {
    async fn register(&self, provider: &ProviderDescriptor) -> Result<()> {
        let request = self
            .request(Method::POST, PROVIDER_PATH)
            .json(&json!({ "provider": provider }));

        self.send(request).await?;
        debug!(provider_id = %provider.id, "Provider registered");
        Ok(())
    }

    async fn unregister(&self, provider_id: &str) -> Result<()> {
        let request = self
            .request(Method::DELETE, PROVIDER_PATH)
            .json(&json!({ "name": provider_id }));

        self.send(request).await?;
        debug!(provider_id, "Provider unregistered");
        Ok(())
    }
}

/// Builds a new [`HostClient`] (and connection pool) per call
#[derive(Debug, Clone)]
pub struct HostClientFactory {
    config: HostConfig,
}

impl HostClientFactory {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }
}

impl TaskSourceFactory for HostClientFactory {
    fn connect(&self) -> Result<Arc<dyn TaskSource>> {
        Ok(Arc::new(HostClient::new(self.config.clone())?))
    }
}
