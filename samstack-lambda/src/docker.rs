//! Docker-backed container runtime
//!
//! Talks to the local Docker daemon through bollard. Lambda base images are
//! started with the invocation event written to the container's stdin.

use crate::container::ContainerSpec;
use crate::runtime::{ContainerRuntime, PullProgress, PullStream, RuntimeError};
use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const DEFAULT_TAG: &str = "latest";

/// Docker daemon connection
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub fn connect() -> Result<Self, RuntimeError> {
        Ok(Self {
            docker: Docker::connect_with_local_defaults()?,
        })
    }

    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Split an image reference into repository and tag for the pull API.
///
/// Digest references are passed through whole with an empty tag. A `:` only
/// starts a tag when no `/` follows it, so registry ports are kept.
pub fn split_image_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, tag),
        _ => (image, DEFAULT_TAG),
    }
}

/// Memory limit in bytes. `None` when it does not fit Docker's `i64`.
fn memory_bytes(mb: u64) -> Option<i64> {
    mb.checked_mul(1024 * 1024)
        .and_then(|bytes| i64::try_from(bytes).ok())
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let env = spec
        .env
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    let binds = spec.mounts.iter().map(|m| m.bind_spec()).collect();

    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();
    for (container_port, host_port) in spec.published_ports() {
        let key = format!("{container_port}/tcp");
        let binding = vec![PortBinding {
            host_ip: Some("127.0.0.1".to_string()),
            host_port: Some(host_port.to_string()),
        }];
        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings.insert(key, Some(binding));
    }
    let has_ports = !exposed_ports.is_empty();

    Config {
        image: Some(spec.image.clone()),
        cmd: (!spec.cmd.is_empty()).then(|| spec.cmd.clone()),
        working_dir: spec.working_dir.clone(),
        env: Some(env),
        attach_stdin: Some(true),
        open_stdin: Some(true),
        stdin_once: Some(true),
        tty: Some(false),
        exposed_ports: has_ports.then_some(exposed_ports),
        host_config: Some(HostConfig {
            binds: Some(binds),
            memory: spec.memory_mb.and_then(memory_bytes),
            network_mode: spec.network.clone(),
            port_bindings: has_ports.then_some(port_bindings),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a> {
        let (from_image, tag) = split_image_reference(image);
        let options = CreateImageOptions {
            from_image,
            tag,
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .map(|update| {
                update
                    .map(|info| PullProgress {
                        status: info.status,
                        layer: info.id,
                    })
                    .map_err(RuntimeError::from)
            })
            .boxed()
    }

    async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let options = spec.name.clone().map(|name| CreateContainerOptions {
            name,
            platform: None,
        });

        debug!(image = %spec.image, name = ?spec.name, "Creating Docker container");
        let response = self
            .docker
            .create_container(options, container_config(spec))
            .await?;

        for warning in &response.warnings {
            debug!(container_id = %response.id, warning = %warning, "Docker warning");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str, input: Option<Bytes>) -> Result<(), RuntimeError> {
        let Some(input) = input else {
            self.docker
                .start_container(id, None::<StartContainerOptions<String>>)
                .await?;
            return Ok(());
        };

        // Attach before starting so no input is lost
        let AttachContainerResults {
            input: mut stdin, ..
        } = self
            .docker
            .attach_container(
                id,
                Some(AttachContainerOptions::<String> {
                    stdin: Some(true),
                    stream: Some(true),
                    ..Default::default()
                }),
            )
            .await?;

        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;

        stdin.write_all(&input).await?;
        stdin.shutdown().await?;
        debug!(container_id = %id, bytes = input.len(), "Wrote invocation input");
        Ok(())
    }

    async fn container_logs(&self, id: &str) -> Result<String, RuntimeError> {
        let mut output = self.docker.logs(
            id,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut logs = Vec::new();
        while let Some(chunk) = output.next().await {
            logs.extend_from_slice(&chunk?.into_bytes());
        }
        Ok(String::from_utf8_lossy(&logs).into_owned())
    }

    async fn delete_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }
}
