//! Container lifecycle errors

use crate::runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Failed to pull image {image}: {reason}")]
    PullFailed { image: String, reason: String },

    #[error("Warm containers are not supported")]
    WarmNotSupported,

    #[error("Container has not been created")]
    NotCreated,

    #[error("Function did not respond within {0} seconds")]
    InvocationTimedOut(u64),

    #[error("Lambda runtime API error: {0}")]
    RuntimeApi(#[from] reqwest::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
