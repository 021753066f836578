//! Lambda container lifecycle for SamStack
//!
//! Provides image management and create/start orchestration for function
//! containers, over Docker or any other [`ContainerRuntime`], and invokes
//! started functions through the Lambda runtime API.

pub mod container;
pub mod docker;
pub mod error;
pub mod function;
pub mod invoke;
pub mod manager;
pub mod pull_policy;
pub mod runtime;

#[cfg(test)]
mod fake;

pub use container::{Container, ContainerSpec, Mount};
pub use docker::DockerRuntime;
pub use error::ContainerError;
pub use function::{ContainerOptions, FunctionConfig, Runtime};
pub use invoke::{free_local_port, InvocationResult, RuntimeApiClient};
pub use manager::{ContainerManager, StartMode};
pub use pull_policy::ImagePullPolicy;
pub use runtime::{ContainerRuntime, PullProgress, RuntimeError};
