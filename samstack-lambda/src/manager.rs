//! Container lifecycle orchestration

use crate::container::Container;
use crate::error::ContainerError;
use crate::pull_policy::ImagePullPolicy;
use crate::runtime::ContainerRuntime;
use bytes::Bytes;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How `run` should obtain a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartMode {
    /// Create (if needed) and start the container for this one invocation
    #[default]
    Cold,
    /// Reuse a long-lived container
    Warm,
}

/// Pulls images and drives containers through create and start.
///
/// The manager holds no per-image or per-container state; containers belong
/// to the caller.
pub struct ContainerManager {
    runtime: Arc<dyn ContainerRuntime>,
    policy: ImagePullPolicy,
}

impl ContainerManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, policy: ImagePullPolicy) -> Self {
        Self { runtime, policy }
    }

    pub fn policy(&self) -> ImagePullPolicy {
        self.policy
    }

    /// Whether the image exists locally. Lookup failures count as absent.
    pub async fn has_image(&self, image: &str) -> bool {
        match self.runtime.image_exists(image).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(image = %image, error = %e, "Image lookup failed");
                false
            }
        }
    }

    /// Pull an image, writing a banner and one `.` per progress update to `out`
    pub async fn pull_image(
        &self,
        image: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<(), ContainerError> {
        write!(out, "\nFetching {image} Docker container image...")?;
        out.flush()?;

        let mut updates = self.runtime.pull_image(image);
        while let Some(update) = updates.next().await {
            let progress = update.map_err(|e| ContainerError::PullFailed {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
            if let Some(status) = &progress.status {
                debug!(image = %image, layer = ?progress.layer, status = %status, "Pull progress");
            }
            write!(out, ".")?;
            out.flush()?;
        }

        writeln!(out)?;
        info!(image = %image, "Pulled image");
        Ok(())
    }

    /// Make sure the image is available, create the container if needed and
    /// start it with `input`. Pull progress goes to stderr.
    pub async fn run(
        &self,
        container: &mut Container,
        input: Option<Bytes>,
        mode: StartMode,
    ) -> Result<(), ContainerError> {
        if mode == StartMode::Warm {
            return Err(ContainerError::WarmNotSupported);
        }

        let image = container.image().to_string();
        let is_local = self.has_image(&image).await;

        if self.policy.should_pull(&image, is_local) {
            match self.pull_image(&image, &mut std::io::stderr()).await {
                Ok(()) => {}
                Err(e) if is_local => {
                    info!(image = %image, error = %e, "Failed to refresh image, using the local copy");
                }
                Err(e) => return Err(e),
            }
        } else {
            debug!(image = %image, is_local, "Skipping image pull");
        }

        if !container.is_created() {
            container.create(self.runtime.as_ref()).await?;
        }
        container.start(self.runtime.as_ref(), input).await
    }

    /// Whether the runtime answers a ping. Never fails.
    pub async fn is_docker_reachable(&self) -> bool {
        match self.runtime.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Container runtime is not reachable");
                false
            }
        }
    }

    pub async fn logs(&self, container: &Container) -> Result<String, ContainerError> {
        container.logs(self.runtime.as_ref()).await
    }

    pub async fn stop(&self, container: &mut Container) -> Result<(), ContainerError> {
        container.delete(self.runtime.as_ref()).await
    }
}
