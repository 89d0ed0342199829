//! Inference gateway
//!
//! Owns the loaded translation engines and exposes a single synchronous
//! [`TranslationGateway::translate`] call. Engines are constructed once at
//! startup; each replica sits behind its own mutex, held for the whole
//! encode -> translate -> decode sequence so no two calls ever touch the
//! same engine state.
//!
//! The call blocks, so async callers run it on `spawn_blocking`.

pub mod engine;
pub mod text;

pub use engine::{EngineError, Hypotheses, InferenceEngine, PassthroughEngine};
pub use text::clean_text;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, InferenceOptions, LoaderConfig};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Error loading the translation model: {0}")]
    LoadFailure(#[source] EngineError),

    #[error("Error translating the input text: {0}")]
    InferenceFailure(#[source] EngineError),

    #[error("Empty result returned from translator")]
    EmptyResult,
}

/// Shared handle to the loaded model replicas
pub struct TranslationGateway {
    replicas: Vec<Mutex<Box<dyn InferenceEngine>>>,
    next_replica: AtomicUsize,
    options: InferenceOptions,
}

impl std::fmt::Debug for TranslationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationGateway")
            .field("replicas", &self.replicas.len())
            .field("options", &self.options)
            .finish()
    }
}

impl TranslationGateway {
    /// Load the engines described by the configuration
    pub fn from_config(config: &Config) -> Result<Self, ModelError> {
        Self::load(&config.loader, config.inference.clone(), engine::load_engine)
    }

    /// Eagerly build `loader.replicas` engines with `build`.
    ///
    /// Any construction failure is fatal: no partially loaded gateway is
    /// ever returned.
    pub fn load<F>(
        loader: &LoaderConfig,
        options: InferenceOptions,
        mut build: F,
    ) -> Result<Self, ModelError>
    where
        F: FnMut(&LoaderConfig) -> Result<Box<dyn InferenceEngine>, EngineError>,
    {
        let count = loader.replicas.max(1);
        info!(replicas = count, "Loading translation model");

        let start = Instant::now();
        let mut engines = Vec::with_capacity(count);
        for replica in 0..count {
            let engine = build(loader).map_err(ModelError::LoadFailure)?;
            debug!(replica, "Model replica ready");
            engines.push(engine);
        }

        info!(
            replicas = count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Translation model loaded"
        );

        Self::from_engines(engines, options)
    }

    /// Wrap already constructed engines
    pub fn from_engines(
        engines: Vec<Box<dyn InferenceEngine>>,
        options: InferenceOptions,
    ) -> Result<Self, ModelError> {
        if engines.is_empty() {
            return Err(ModelError::LoadFailure(EngineError::NoModelSource));
        }

        Ok(Self {
            replicas: engines.into_iter().map(Mutex::new).collect(),
            next_replica: AtomicUsize::new(0),
            options,
        })
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Translate `text` into `target_language`.
    ///
    /// The text is normalized with [`clean_text`] and prefixed with the
    /// `<2{lang}>` tag the model vocabulary uses to select the output
    /// language. Only the best hypothesis is returned.
    pub fn translate(&self, target_language: &str, text: &str) -> Result<String, ModelError> {
        debug!(target_language, "Translating text");

        let model_input = format!("<2{}> {}", target_language, clean_text(text));
        let start = Instant::now();

        let (replica, mut engine) = self.acquire();
        let result = run_sequence(&mut **engine, &model_input, &self.options);
        drop(engine);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(target_language, replica, elapsed_ms, "Translation finished"),
            Err(e) => warn!(target_language, replica, elapsed_ms, error = %e, "Translation failed"),
        }

        result
    }

    /// [`translate`](Self::translate) on the blocking thread pool.
    ///
    /// A panic inside the engine surfaces as an inference failure for this
    /// request only.
    pub async fn translate_async(
        self: &Arc<Self>,
        target_language: &str,
        text: &str,
    ) -> Result<String, ModelError> {
        let gateway = Arc::clone(self);
        let target_language = target_language.to_string();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || gateway.translate(&target_language, &text))
            .await
            .map_err(|e| {
                ModelError::InferenceFailure(EngineError::Translation(format!(
                    "translation task aborted: {}",
                    e
                )))
            })?
    }

    /// Pick a replica: the first idle one starting from the round-robin
    /// cursor, otherwise wait on the cursor's replica.
    fn acquire(&self) -> (usize, MutexGuard<'_, Box<dyn InferenceEngine>>) {
        let len = self.replicas.len();
        let start = self.next_replica.fetch_add(1, Ordering::Relaxed) % len;

        for offset in 0..len {
            let idx = (start + offset) % len;
            match self.replicas[idx].try_lock() {
                Ok(guard) => return (idx, guard),
                Err(std::sync::TryLockError::Poisoned(poisoned)) => {
                    warn!(replica = idx, "Recovering engine lock after a panicked call");
                    return (idx, poisoned.into_inner());
                }
                Err(std::sync::TryLockError::WouldBlock) => continue,
            }
        }

        let guard = self.replicas[start]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (start, guard)
    }
}

fn run_sequence(
    engine: &mut dyn InferenceEngine,
    model_input: &str,
    options: &InferenceOptions,
) -> Result<String, ModelError> {
    let tokens = engine
        .encode(model_input)
        .map_err(ModelError::InferenceFailure)?;

    let results = engine
        .translate_batch(&[tokens], options)
        .map_err(ModelError::InferenceFailure)?;

    // TODO: surface alternative hypotheses when num_hypotheses > 1
    let best = results
        .first()
        .and_then(|hypotheses| hypotheses.first())
        .ok_or(ModelError::EmptyResult)?;

    let translation = engine.decode(best).map_err(ModelError::InferenceFailure)?;
    debug!(translation = %translation, "Translated string");

    Ok(translation)
}
