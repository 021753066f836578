//! Lambda function models

use crate::container::Container;
use crate::invoke::RUNTIME_API_PORT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Where function code is mounted inside the container
pub const TASK_ROOT: &str = "/var/task";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported Lambda runtime: {0}")]
pub struct UnsupportedRuntime(pub String);

/// Supported Lambda runtimes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Runtime {
    #[serde(rename = "python3.9")]
    Python39,
    #[serde(rename = "python3.10")]
    Python310,
    #[serde(rename = "python3.11")]
    Python311,
    #[serde(rename = "python3.12")]
    Python312,
    #[serde(rename = "nodejs18.x")]
    Nodejs18,
    #[serde(rename = "nodejs20.x")]
    Nodejs20,
    #[serde(rename = "java17")]
    Java17,
    #[serde(rename = "provided.al2")]
    ProvidedAl2,
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
}

impl Runtime {
    /// Lambda base image for this runtime
    pub fn docker_image(&self) -> &'static str {
        match self {
            Self::Python39 => "public.ecr.aws/lambda/python:3.9",
            Self::Python310 => "public.ecr.aws/lambda/python:3.10",
            Self::Python311 => "public.ecr.aws/lambda/python:3.11",
            Self::Python312 => "public.ecr.aws/lambda/python:3.12",
            Self::Nodejs18 => "public.ecr.aws/lambda/nodejs:18",
            Self::Nodejs20 => "public.ecr.aws/lambda/nodejs:20",
            Self::Java17 => "public.ecr.aws/lambda/java:17",
            Self::ProvidedAl2 => "public.ecr.aws/lambda/provided:al2",
            Self::ProvidedAl2023 => "public.ecr.aws/lambda/provided:al2023",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python39 => "python3.9",
            Self::Python310 => "python3.10",
            Self::Python311 => "python3.11",
            Self::Python312 => "python3.12",
            Self::Nodejs18 => "nodejs18.x",
            Self::Nodejs20 => "nodejs20.x",
            Self::Java17 => "java17",
            Self::ProvidedAl2 => "provided.al2",
            Self::ProvidedAl2023 => "provided.al2023",
        }
    }
}

impl FromStr for Runtime {
    type Err = UnsupportedRuntime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python3.9" => Ok(Self::Python39),
            "python3.10" => Ok(Self::Python310),
            "python3.11" => Ok(Self::Python311),
            "python3.12" => Ok(Self::Python312),
            "nodejs18.x" => Ok(Self::Nodejs18),
            "nodejs20.x" => Ok(Self::Nodejs20),
            "java17" => Ok(Self::Java17),
            "provided.al2" => Ok(Self::ProvidedAl2),
            "provided.al2023" => Ok(Self::ProvidedAl2023),
            other => Err(UnsupportedRuntime(other.to_string())),
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Function configuration
#[derive(Debug, Clone)]
pub struct FunctionConfig {
    pub function_name: String,
    pub runtime: Runtime,
    pub handler: String,
    /// Unpacked code directory on the host
    pub code_path: PathBuf,
    pub memory_size: u64,
    pub timeout: u64,
    pub environment: HashMap<String, String>,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            runtime: Runtime::Python312,
            handler: "lambda_function.lambda_handler".to_string(),
            code_path: PathBuf::from("."),
            memory_size: 128,
            timeout: 3,
            environment: HashMap::new(),
        }
    }
}

/// Host-side settings shared by every function container
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    pub region: String,
    pub docker_network: Option<String>,
    pub debug_port: Option<u16>,
    /// Host port for the container's Lambda runtime API
    pub runtime_api_port: Option<u16>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            docker_network: None,
            debug_port: None,
            runtime_api_port: None,
        }
    }
}

impl FunctionConfig {
    /// Container that runs this function on its runtime's base image.
    ///
    /// Function environment variables are applied last, so they override the
    /// Lambda defaults of the same name.
    pub fn container(&self, options: &ContainerOptions) -> Container {
        let name = format!(
            "samstack-lambda-{}-{}",
            self.function_name,
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        let mut container = Container::new(self.runtime.docker_image())
            .with_name(name)
            .with_cmd([self.handler.as_str()])
            .with_working_dir(TASK_ROOT)
            .with_mount(&self.code_path, TASK_ROOT, true)
            .with_memory_mb(self.memory_size);

        let lambda_env = [
            ("AWS_LAMBDA_FUNCTION_NAME", self.function_name.clone()),
            ("AWS_LAMBDA_FUNCTION_VERSION", "$LATEST".to_string()),
            ("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", self.memory_size.to_string()),
            ("AWS_LAMBDA_FUNCTION_TIMEOUT", self.timeout.to_string()),
            ("AWS_REGION", options.region.clone()),
            ("AWS_DEFAULT_REGION", options.region.clone()),
            ("_HANDLER", self.handler.clone()),
        ];
        for (key, value) in lambda_env {
            container = container.with_env(key, value);
        }
        for (key, value) in &self.environment {
            container = container.with_env(key.as_str(), value.as_str());
        }

        if let Some(network) = &options.docker_network {
            container = container.with_network(network.as_str());
        }
        if let Some(port) = options.debug_port {
            container = container.with_debug_port(port);
        }
        if let Some(port) = options.runtime_api_port {
            container = container.with_port(RUNTIME_API_PORT, port);
        }
        container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_docker_image() {
        assert_eq!(
            Runtime::Python312.docker_image(),
            "public.ecr.aws/lambda/python:3.12"
        );
        assert_eq!(
            Runtime::Nodejs20.docker_image(),
            "public.ecr.aws/lambda/nodejs:20"
        );
    }

    #[test]
    fn test_runtime_names() {
        assert_eq!("nodejs18.x".parse::<Runtime>().unwrap(), Runtime::Nodejs18);
        assert_eq!(Runtime::ProvidedAl2023.to_string(), "provided.al2023");
        assert_eq!(
            "cobol1.0".parse::<Runtime>(),
            Err(UnsupportedRuntime("cobol1.0".to_string()))
        );

        let parsed: Runtime = serde_json::from_str("\"python3.11\"").unwrap();
        assert_eq!(parsed, Runtime::Python311);
    }

    #[test]
    fn test_function_container() {
        let config = FunctionConfig {
            function_name: "HelloWorld".to_string(),
            runtime: Runtime::Nodejs18,
            handler: "app.handler".to_string(),
            code_path: PathBuf::from("/build/hello"),
            memory_size: 512,
            environment: HashMap::from([
                ("TABLE".to_string(), "hello".to_string()),
                ("AWS_REGION".to_string(), "eu-west-1".to_string()),
            ]),
            ..Default::default()
        };
        let options = ContainerOptions {
            docker_network: Some("samstack".to_string()),
            debug_port: Some(9229),
            runtime_api_port: Some(49152),
            ..Default::default()
        };

        let container = config.container(&options);
        let spec = container.spec();

        assert_eq!(container.image(), "public.ecr.aws/lambda/nodejs:18");
        assert!(spec.name.as_deref().unwrap().starts_with("samstack-lambda-HelloWorld-"));
        assert_eq!(spec.cmd, vec!["app.handler"]);
        assert_eq!(spec.mounts[0].bind_spec(), "/build/hello:/var/task:ro");
        assert_eq!(spec.memory_mb, Some(512));
        assert_eq!(spec.network.as_deref(), Some("samstack"));
        assert_eq!(spec.debug_port, Some(9229));
        assert_eq!(spec.ports.get(&8080), Some(&49152));

        let env = |key: &str| spec.env.get(key).map(String::as_str);
        assert_eq!(env("AWS_LAMBDA_FUNCTION_NAME"), Some("HelloWorld"));
        assert_eq!(env("AWS_LAMBDA_FUNCTION_MEMORY_SIZE"), Some("512"));
        assert_eq!(env("TABLE"), Some("hello"));
        assert_eq!(env("AWS_REGION"), Some("eu-west-1"));
        assert_eq!(env("AWS_DEFAULT_REGION"), Some("us-east-1"));
    }
}
