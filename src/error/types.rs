use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection of malformed position data at the input boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field `{field}` on position {position}")]
    MissingField { position: String, field: &'static str },

    #[error("Field `{field}` on position {position} must not be empty")]
    EmptyField { position: String, field: &'static str },

    #[error("Negative amount for `{field}` on position {position}: {value}")]
    NegativeAmount {
        position: String,
        field: &'static str,
        value: String,
    },

    #[error("Invalid percentage for `{field}` on position {position}: {value}")]
    InvalidPercentage {
        position: String,
        field: &'static str,
        value: f64,
    },

    #[error("Duplicate position id in snapshot: {id}")]
    DuplicateId { id: String },
}

/// Failure reported by an action executor. The engine never retries it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("Execution failed: {reason}")]
pub struct ExecutionError {
    pub reason: String,
}

impl ExecutionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Snapshot source error: {0}")]
    SnapshotError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}
