//! Route resolution errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The template is well-formed but describes something API Gateway would reject
    #[error("Invalid SAM document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
