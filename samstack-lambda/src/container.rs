//! Containers and their creation settings

use crate::error::ContainerError;
use crate::runtime::ContainerRuntime;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// A host directory mounted into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

impl Mount {
    /// Docker bind syntax, `host:container[:ro]`
    pub fn bind_spec(&self) -> String {
        let mut spec = format!("{}:{}", self.host_path.display(), self.container_path);
        if self.read_only {
            spec.push_str(":ro");
        }
        spec
    }
}

/// Everything needed to create a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub name: Option<String>,
    pub cmd: Vec<String>,
    pub working_dir: Option<String>,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub memory_mb: Option<u64>,
    pub network: Option<String>,
    /// Published on the same host port, bound to localhost
    pub debug_port: Option<u16>,
    /// Container port to localhost host port
    pub ports: BTreeMap<u16, u16>,
}

impl ContainerSpec {
    /// Every published port as `(container, host)`, the debug port included
    pub fn published_ports(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.debug_port
            .map(|port| (port, port))
            .into_iter()
            .chain(self.ports.iter().map(|(&container, &host)| (container, host)))
    }
}

/// A container the caller owns. It starts out absent and records its id once
/// created.
#[derive(Debug, Clone)]
pub struct Container {
    spec: ContainerSpec,
    id: Option<String>,
}

impl Container {
    pub fn new(image: impl Into<String>) -> Self {
        Self::from_spec(ContainerSpec {
            image: image.into(),
            ..Default::default()
        })
    }

    pub fn from_spec(spec: ContainerSpec) -> Self {
        Self { spec, id: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.spec.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.env.insert(key.into(), value.into());
        self
    }

    pub fn with_mount(
        mut self,
        host_path: impl Into<PathBuf>,
        container_path: impl Into<String>,
        read_only: bool,
    ) -> Self {
        self.spec.mounts.push(Mount {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only,
        });
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.spec.memory_mb = Some(memory_mb);
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.spec.network = Some(network.into());
        self
    }

    pub fn with_debug_port(mut self, port: u16) -> Self {
        self.spec.debug_port = Some(port);
        self
    }

    pub fn with_port(mut self, container_port: u16, host_port: u16) -> Self {
        self.spec.ports.insert(container_port, host_port);
        self
    }

    pub fn image(&self) -> &str {
        &self.spec.image
    }

    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }

    /// Create the container unless it already exists
    pub async fn create(&mut self, runtime: &dyn ContainerRuntime) -> Result<&str, ContainerError> {
        if self.id.is_none() {
            let id = runtime.create_container(&self.spec).await?;
            info!(container_id = %id, image = %self.spec.image, "Created container");
            self.id = Some(id);
        }
        self.id.as_deref().ok_or(ContainerError::NotCreated)
    }

    pub async fn start(
        &self,
        runtime: &dyn ContainerRuntime,
        input: Option<Bytes>,
    ) -> Result<(), ContainerError> {
        let id = self.id.as_deref().ok_or(ContainerError::NotCreated)?;
        debug!(container_id = %id, has_input = input.is_some(), "Starting container");
        runtime.start_container(id, input).await?;
        Ok(())
    }

    /// Everything the container wrote to stdout and stderr so far
    pub async fn logs(&self, runtime: &dyn ContainerRuntime) -> Result<String, ContainerError> {
        let id = self.id.as_deref().ok_or(ContainerError::NotCreated)?;
        Ok(runtime.container_logs(id).await?)
    }

    /// Remove the container. A container that was never created is left alone.
    pub async fn delete(&mut self, runtime: &dyn ContainerRuntime) -> Result<(), ContainerError> {
        let Some(id) = self.id.as_deref() else {
            return Ok(());
        };
        runtime.delete_container(id).await?;
        debug!(container_id = %id, "Removed container");
        self.id = None;
        Ok(())
    }
}
