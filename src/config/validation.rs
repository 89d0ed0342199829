use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Both 'model_name' and '{path_key}' are present in [loader], remove one of them")]
    ConflictingModelSource { path_key: String },

    #[error("Neither 'model_name' nor 'model_path' is present in [loader], add one of them")]
    MissingModelSource,

    #[error("idle_polling_interval must be a finite number >= 0, got {value}")]
    InvalidPollingInterval { value: f64 },

    #[error("{field} must be at least 1")]
    ZeroLimit { field: String },

    #[error("Invalid host base_url '{url}', expected an http:// or https:// URL")]
    InvalidBaseUrl { url: String },

    #[error("Provider field '{field}' must not be empty")]
    EmptyProviderField { field: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_loader(config)?;
    validate_worker(config)?;
    validate_inference(config)?;
    validate_host(config)?;
    validate_provider(config)?;
    Ok(())
}

/// Exactly one model source must be configured
fn validate_loader(config: &Config) -> Result<(), ValidationError> {
    let loader = &config.loader;

    if loader.model_path.is_some() && loader.hf_model_path.is_some() {
        return Err(ValidationError::ConflictingModelSource {
            path_key: "hf_model_path".to_string(),
        });
    }

    let path_key = if loader.model_path.is_some() {
        Some("model_path")
    } else if loader.hf_model_path.is_some() {
        Some("hf_model_path")
    } else {
        None
    };

    match (&loader.model_name, path_key) {
        (Some(_), Some(key)) => Err(ValidationError::ConflictingModelSource {
            path_key: key.to_string(),
        }),
        (None, None) => Err(ValidationError::MissingModelSource),
        _ => {
            if loader.replicas == 0 {
                return Err(ValidationError::ZeroLimit {
                    field: "loader.replicas".to_string(),
                });
            }
            Ok(())
        }
    }
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    let interval = config.worker.idle_polling_interval;
    if !interval.is_finite() || interval < 0.0 {
        return Err(ValidationError::InvalidPollingInterval { value: interval });
    }

    if config.worker.max_inflight_tasks == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "worker.max_inflight_tasks".to_string(),
        });
    }

    Ok(())
}

fn validate_inference(config: &Config) -> Result<(), ValidationError> {
    if config.inference.beam_size == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "inference.beam_size".to_string(),
        });
    }

    if config.inference.num_hypotheses == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "inference.num_hypotheses".to_string(),
        });
    }

    Ok(())
}

fn validate_host(config: &Config) -> Result<(), ValidationError> {
    let url = &config.host.base_url;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::InvalidBaseUrl { url: url.clone() });
    }
    Ok(())
}

fn validate_provider(config: &Config) -> Result<(), ValidationError> {
    let provider = &config.provider;
    for (field, value) in [
        ("id", &provider.id),
        ("name", &provider.name),
        ("task_type_id", &provider.task_type_id),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyProviderField {
                field: field.to_string(),
            });
        }
    }

    if config.host.app_id.trim().is_empty() {
        return Err(ValidationError::EmptyProviderField {
            field: "host.app_id".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::*;
    use std::path::PathBuf;

    fn create_test_config() -> Config {
        Config {
            loader: LoaderConfig {
                model_path: Some(PathBuf::from("/models/madlad")),
                ..LoaderConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_both_model_keys() {
        let mut config = create_test_config();
        config.loader.model_name = Some("madlad".to_string());

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ConflictingModelSource { ref path_key }) if path_key == "model_path"
        ));
    }

    #[test]
    fn test_model_name_with_hf_path() {
        let mut config = create_test_config();
        config.loader.model_path = None;
        config.loader.hf_model_path = Some(PathBuf::from("/hf"));
        config.loader.model_name = Some("madlad".to_string());

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ConflictingModelSource { ref path_key }) if path_key == "hf_model_path"
        ));
    }

    #[test]
    fn test_neither_model_key() {
        let mut config = create_test_config();
        config.loader.model_path = None;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::MissingModelSource)));
    }

    #[test]
    fn test_model_name_alone_is_valid() {
        let mut config = create_test_config();
        config.loader.model_path = None;
        config.loader.model_name = Some("madlad".to_string());

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_negative_polling_interval() {
        let mut config = create_test_config();
        config.worker.idle_polling_interval = -1.0;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidPollingInterval { .. })
        ));

        config.worker.idle_polling_interval = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_polling_interval_allowed() {
        let mut config = create_test_config();
        config.worker.idle_polling_interval = 0.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_inflight_tasks() {
        let mut config = create_test_config();
        config.worker.max_inflight_tasks = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::ZeroLimit { .. })));
    }

    #[test]
    fn test_zero_replicas() {
        let mut config = create_test_config();
        config.loader.replicas = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::ZeroLimit { .. })));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = create_test_config();
        config.host.base_url = "ftp://host".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_empty_task_type() {
        let mut config = create_test_config();
        config.provider.task_type_id = "  ".to_string();

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::EmptyProviderField { .. })
        ));
    }
}
