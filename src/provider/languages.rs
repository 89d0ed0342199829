//! Supported language list published with the provider registration

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LanguagesError {
    #[error("Error reading languages list at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid languages list at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Languages list at {0} is empty")]
    Empty(String),
}

/// Read a JSON object mapping language codes to display names
pub fn load_languages(path: &Path) -> Result<BTreeMap<String, String>, LanguagesError> {
    let shown = path.display().to_string();

    let raw = fs::read_to_string(path).map_err(|source| LanguagesError::Read {
        path: shown.clone(),
        source,
    })?;

    let languages: BTreeMap<String, String> =
        serde_json::from_str(&raw).map_err(|source| LanguagesError::Parse {
            path: shown.clone(),
            source,
        })?;

    if languages.is_empty() {
        return Err(LanguagesError::Empty(shown));
    }

    tracing::info!(count = languages.len(), path = %shown, "Loaded language list");
    Ok(languages)
}
