//! Inference engine seam
//!
//! The gateway never sees concrete model handles, only this trait. An engine
//! bundles a tokenizer and a translation model; every method takes `&mut self`
//! so one instance is only ever driven by one caller at a time.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{EngineKind, InferenceOptions, LoaderConfig};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model file not found: {0}")]
    MissingFile(PathBuf),

    #[error("no model source configured")]
    NoModelSource,

    #[error("tokenizer failed: {0}")]
    Tokenizer(String),

    #[error("translation failed: {0}")]
    Translation(String),
}

/// Hypotheses for one input, best first. Each hypothesis is a token sequence.
pub type Hypotheses = Vec<Vec<String>>;

/// Tokenizer + model pair driven by the gateway
pub trait InferenceEngine: Send {
    /// Split the tagged input into model tokens
    fn encode(&mut self, input: &str) -> Result<Vec<String>, EngineError>;

    /// Translate a batch of token sequences, one entry per input
    fn translate_batch(
        &mut self,
        batch: &[Vec<String>],
        options: &InferenceOptions,
    ) -> Result<Vec<Hypotheses>, EngineError>;

    /// Join output tokens back into text
    fn decode(&mut self, tokens: &[String]) -> Result<String, EngineError>;
}

/// Development engine: whitespace tokenizer that echoes the input back
/// without its target-language tag.
#[derive(Debug, Default)]
pub struct PassthroughEngine;

impl PassthroughEngine {
    pub fn new() -> Self {
        Self
    }
}

fn is_language_tag(token: &str) -> bool {
    token.starts_with("<2") && token.ends_with('>')
}

impl InferenceEngine for PassthroughEngine {
    fn encode(&mut self, input: &str) -> Result<Vec<String>, EngineError> {
        Ok(input.split_whitespace().map(str::to_owned).collect())
    }

    fn translate_batch(
        &mut self,
        batch: &[Vec<String>],
        options: &InferenceOptions,
    ) -> Result<Vec<Hypotheses>, EngineError> {
        Ok(batch
            .iter()
            .map(|tokens| {
                let hypothesis: Vec<String> = tokens
                    .iter()
                    .filter(|token| !is_language_tag(token))
                    .take(options.max_decoding_length)
                    .cloned()
                    .collect();
                vec![hypothesis]
            })
            .collect())
    }

    fn decode(&mut self, tokens: &[String]) -> Result<String, EngineError> {
        Ok(tokens.join(" "))
    }
}

/// Build one engine instance from the loader settings.
///
/// The model directory and tokenizer file must exist regardless of the
/// engine kind.
pub fn load_engine(loader: &LoaderConfig) -> Result<Box<dyn InferenceEngine>, EngineError> {
    let model_dir = loader
        .resolved_model_path()
        .ok_or(EngineError::NoModelSource)?;
    require_exists(&model_dir)?;

    let tokenizer = loader.tokenizer_path().ok_or(EngineError::NoModelSource)?;
    require_exists(&tokenizer)?;

    debug!(
        model_dir = %model_dir.display(),
        tokenizer = %tokenizer.display(),
        device = ?loader.device,
        "Loading engine"
    );

    let engine: Box<dyn InferenceEngine> = match loader.engine {
        EngineKind::Passthrough => Box::new(PassthroughEngine::new()),
    };

    info!(engine = ?loader.engine, model_dir = %model_dir.display(), "Engine loaded");
    Ok(engine)
}

fn require_exists(path: &Path) -> Result<(), EngineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(EngineError::MissingFile(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_passthrough_strips_language_tag() {
        let mut engine = PassthroughEngine::new();
        let tokens = engine.encode("<2es> Hello world").unwrap();
        assert_eq!(tokens, vec!["<2es>", "Hello", "world"]);

        let results = engine
            .translate_batch(&[tokens], &InferenceOptions::default())
            .unwrap();
        assert_eq!(results.len(), 1);

        let text = engine.decode(&results[0][0]).unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_load_engine_requires_tokenizer() {
        let temp_dir = TempDir::new().unwrap();
        let loader = LoaderConfig {
            model_path: Some(temp_dir.path().to_path_buf()),
            ..LoaderConfig::default()
        };

        let err = load_engine(&loader).err().unwrap();
        assert!(matches!(err, EngineError::MissingFile(ref p) if p.ends_with("spm.model")));

        fs::write(temp_dir.path().join("spm.model"), b"stub").unwrap();
        assert!(load_engine(&loader).is_ok());
    }

    #[test]
    fn test_load_engine_missing_model_dir() {
        let loader = LoaderConfig {
            model_name: Some("does-not-exist".to_string()),
            models_dir: PathBuf::from("/nonexistent/models"),
            ..LoaderConfig::default()
        };

        assert!(matches!(
            load_engine(&loader).err().unwrap(),
            EngineError::MissingFile(_)
        ));
    }

    #[test]
    fn test_load_engine_without_source() {
        let loader = LoaderConfig::default();
        assert!(matches!(
            load_engine(&loader).err().unwrap(),
            EngineError::NoModelSource
        ));
    }
}
