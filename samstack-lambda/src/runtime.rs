//! Container runtime abstraction
//!
//! The manager only talks to a container engine through [`ContainerRuntime`],
//! so tests can drive it with an in-memory fake while the binary uses Docker.

use crate::container::ContainerSpec;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors reported by a container engine
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Container runtime error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One status update from an image pull
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullProgress {
    pub status: Option<String>,
    /// Layer the update refers to, when it refers to one
    pub layer: Option<String>,
}

pub type PullStream<'a> = BoxStream<'a, Result<PullProgress, RuntimeError>>;

/// Operations the container manager needs from an engine
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// `Ok(false)` when the engine answers that the image is unknown
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Stream of progress updates; the pull is finished when the stream ends
    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a>;

    async fn ping(&self) -> Result<(), RuntimeError>;

    /// Create a container and return its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Start a created container, writing `input` to its stdin
    async fn start_container(&self, id: &str, input: Option<Bytes>) -> Result<(), RuntimeError>;

    /// Combined stdout and stderr written so far
    async fn container_logs(&self, id: &str) -> Result<String, RuntimeError>;

    /// Remove a container, stopping it first if it is running
    async fn delete_container(&self, id: &str) -> Result<(), RuntimeError>;
}
