use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub inference: InferenceOptions,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Upper bound for `POST /translate` bodies
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9000))
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024 // 1 MB
}

/// Connection to the host application that owns the task queue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    /// User the requests are made on behalf of (empty for system requests)
    #[serde(default)]
    pub user: String,
    /// Shared secret (loaded from environment, not from config file)
    #[serde(skip)]
    pub app_secret: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl HostConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_id: default_app_id(),
            app_version: default_app_version(),
            user: String::new(),
            app_secret: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_app_id() -> String {
    "translate2".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Provider registration record published to the host
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_id")]
    pub id: String,
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_task_type_id")]
    pub task_type_id: String,
    /// JSON map of language code -> display name
    #[serde(default = "default_languages_file")]
    pub languages_file: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: default_provider_id(),
            name: default_provider_name(),
            task_type_id: default_task_type_id(),
            languages_file: default_languages_file(),
        }
    }
}

fn default_provider_id() -> String {
    "translate2".to_string()
}

fn default_provider_name() -> String {
    "Local Machine Translation".to_string()
}

fn default_task_type_id() -> String {
    "core:text2text:translate".to_string()
}

fn default_languages_file() -> PathBuf {
    PathBuf::from("languages.json")
}

/// Polling worker settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerSettings {
    /// Seconds between polls of an empty queue
    #[serde(default = "default_idle_polling_interval")]
    pub idle_polling_interval: f64,
    #[serde(default = "default_max_inflight_tasks")]
    pub max_inflight_tasks: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_polling_interval: default_idle_polling_interval(),
            max_inflight_tasks: default_max_inflight_tasks(),
        }
    }
}

fn default_idle_polling_interval() -> f64 {
    5.0
}

fn default_max_inflight_tasks() -> usize {
    4
}

/// Engine implementation backing the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Passthrough,
}

/// Compute device the model is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl Default for Device {
    /// GPU unless `COMPUTE_DEVICE=cpu`
    fn default() -> Self {
        match std::env::var("COMPUTE_DEVICE") {
            Ok(value) if value.eq_ignore_ascii_case("cpu") => Device::Cpu,
            _ => Device::Cuda,
        }
    }
}

/// Model loading parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub engine: EngineKind,
    /// Name of a model directory under `models_dir`
    pub model_name: Option<String>,
    pub model_path: Option<PathBuf>,
    /// Alias of `model_path`
    pub hf_model_path: Option<PathBuf>,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_tokenizer_file")]
    pub tokenizer_file: String,
    #[serde(default)]
    pub device: Device,
    /// Number of model instances kept in memory
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

impl LoaderConfig {
    /// Directory holding the model weights and tokenizer.
    ///
    /// Returns `None` when no model key is set; validation rejects that case
    /// before the loader ever runs.
    pub fn resolved_model_path(&self) -> Option<PathBuf> {
        self.model_path
            .clone()
            .or_else(|| self.hf_model_path.clone())
            .or_else(|| self.model_name.as_ref().map(|name| self.models_dir.join(name)))
    }

    pub fn tokenizer_path(&self) -> Option<PathBuf> {
        self.resolved_model_path()
            .map(|dir| dir.join(&self.tokenizer_file))
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            model_name: None,
            model_path: None,
            hf_model_path: None,
            models_dir: default_models_dir(),
            tokenizer_file: default_tokenizer_file(),
            device: Device::default(),
            replicas: default_replicas(),
        }
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_tokenizer_file() -> String {
    "spm.model".to_string()
}

fn default_replicas() -> usize {
    1
}

/// Decoding options forwarded to the engine on every batch
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InferenceOptions {
    #[serde(default = "default_beam_size")]
    pub beam_size: usize,
    /// Token budget per batch, 0 = unlimited
    #[serde(default)]
    pub max_batch_size: usize,
    #[serde(default = "default_max_decoding_length")]
    pub max_decoding_length: usize,
    #[serde(default = "default_num_hypotheses")]
    pub num_hypotheses: usize,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            beam_size: default_beam_size(),
            max_batch_size: 0,
            max_decoding_length: default_max_decoding_length(),
            num_hypotheses: default_num_hypotheses(),
        }
    }
}

fn default_beam_size() -> usize {
    4
}

fn default_max_decoding_length() -> usize {
    256
}

fn default_num_hypotheses() -> usize {
    1
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
