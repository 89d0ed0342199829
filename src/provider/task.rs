use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Provider-assigned task identifier, numeric or textual depending on the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(u64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Number(id) => write!(f, "{id}"),
            TaskId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        TaskId::Number(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId::Text(value.to_string())
    }
}

/// A task as handed out by the host; `input` is validated separately
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub input: Value,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, input: Value) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("task input is missing or not an object")]
    NotAnObject,

    #[error("task input is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("target_language must not be empty")]
    EmptyTargetLanguage,
}

/// Validated translation request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationInput {
    /// Source language, `"auto"` or absent when the engine should detect it
    #[serde(default)]
    pub origin_language: Option<String>,
    pub target_language: String,
    pub input: String,
}

impl TranslationInput {
    pub fn from_task(task: &Task) -> Result<Self, InputError> {
        if !task.input.is_object() {
            return Err(InputError::NotAnObject);
        }

        let input: TranslationInput = serde_json::from_value(task.input.clone())?;
        if input.target_language.trim().is_empty() {
            return Err(InputError::EmptyTargetLanguage);
        }

        Ok(input)
    }
}

/// Terminal result of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Output(String),
    Error(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Output(_))
    }
}
