//! Configuration management for transbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! Configuration is read once at startup and never reloaded.
//!
//! # Usage
//!
//! ```no_run
//! use transbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Polling every {}s", config.worker.idle_polling_interval);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `TRANSBOX__<section>__<key>`
//!
//! Examples:
//! - `TRANSBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `TRANSBOX__WORKER__IDLE_POLLING_INTERVAL=2.5`
//! - `TRANSBOX__LOADER__MODEL_PATH=/models/madlad400-3b`
//!
//! The host app secret is read from `TRANSBOX_APP_SECRET` or `APP_SECRET`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/transbox.toml`.
//! This can be overridden using the `TRANSBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, Device, EngineKind, HostConfig, InferenceOptions, LoaderConfig, ProviderConfig,
    ServerConfig, TelemetryConfig, WorkerSettings,
};
pub use validation::ValidationError;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or if
    /// validation fails (conflicting model keys, negative intervals, ...).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], reading `config_path` instead of the default file
    pub fn load_with(config_path: Option<std::path::PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(config_path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration assembled in code
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }
}

impl WorkerSettings {
    /// Idle polling interval as a `Duration`.
    ///
    /// Only meaningful after validation, which rejects negative and
    /// non-finite values.
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs_f64(self.idle_polling_interval.max(0.0))
    }
}
