//! SamStack - local API Gateway and Lambda emulation
//!
//! Resolves the HTTP routes a SAM or CloudFormation template exposes and runs
//! function containers on the local Docker daemon.

mod config;

use anyhow::{anyhow, Context};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use samstack_apigateway::{ApiCollection, FsSwaggerReader, RefResolver, RouteResolver, Template};
use samstack_lambda::{
    free_local_port, Container, ContainerManager, ContainerOptions, DockerRuntime, FunctionConfig,
    ImagePullPolicy, InvocationResult, Runtime, RuntimeApiClient, StartMode,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "samstack")]
#[command(about = "Local API Gateway and Lambda emulation", long_about = None)]
struct Args {
    /// Template to read (defaults to template.yaml)
    #[arg(short, long, global = true, env = "SAMSTACK_TEMPLATE")]
    template: Option<PathBuf>,

    /// Base directory for relative swagger and code paths
    #[arg(long, global = true, env = "SAMSTACK_WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// Use local images without checking for newer versions
    #[arg(long, global = true, env = "SAMSTACK_SKIP_PULL_IMAGE")]
    skip_pull_image: bool,

    /// Docker network for function containers
    #[arg(long, global = true, env = "SAMSTACK_DOCKER_NETWORK")]
    docker_network: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SAMSTACK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Configuration file name, without extension
    #[arg(long, global = true, default_value = "samstack", env = "SAMSTACK_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every API and route the template exposes
    Routes,

    /// Check that the Docker daemon is reachable
    Doctor,

    /// Pull a container image
    Pull { image: String },

    /// Invoke a function once with an event and print its response
    Invoke {
        /// Logical id of the function
        function: String,

        /// JSON event file (defaults to `{}`)
        #[arg(short, long)]
        event: Option<PathBuf>,

        /// Publish this port for a debugger
        #[arg(long)]
        debug_port: Option<u16>,
    },
}

/// CLI flags over file and environment configuration
struct Settings {
    template: PathBuf,
    working_dir: PathBuf,
    skip_pull_image: bool,
    docker_network: Option<String>,
    memory_mb: u64,
}

impl Settings {
    fn resolve(args: &Args, config: config::Config) -> Self {
        Self {
            template: args.template.clone().unwrap_or(config.template.path),
            working_dir: args.working_dir.clone().unwrap_or(config.template.working_dir),
            skip_pull_image: args.skip_pull_image || config.docker.skip_pull_image,
            docker_network: args.docker_network.clone().or(config.docker.network),
            memory_mb: config.docker.memory_mb,
        }
    }

    fn load_template(&self) -> anyhow::Result<Template> {
        Template::load(&self.template)
            .with_context(|| format!("Failed to read template {}", self.template.display()))
    }

    fn container_manager(&self) -> anyhow::Result<ContainerManager> {
        let runtime = DockerRuntime::connect().context("Failed to connect to Docker")?;
        Ok(ContainerManager::new(
            Arc::new(runtime),
            ImagePullPolicy::new(self.skip_pull_image),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::Config::load(&args.config)?;
    let log_level = args.log_level.clone().unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("samstack={log_level},samstack_apigateway={log_level},samstack_lambda={log_level}")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::resolve(&args, config);

    match args.command {
        Command::Routes => {
            let template = settings.load_template()?;
            let reader = FsSwaggerReader::new(&settings.working_dir);
            let apis = RouteResolver::new(&reader, &RefResolver).resolve(&template)?;
            print!("{}", render_apis(&apis));
        }
        Command::Doctor => {
            let manager = settings.container_manager()?;
            if manager.is_docker_reachable().await {
                println!("Docker is reachable");
            } else {
                return Err(anyhow!("Docker is not reachable"));
            }
        }
        Command::Pull { image } => {
            let manager = settings.container_manager()?;
            manager.pull_image(&image, &mut std::io::stderr()).await?;
        }
        Command::Invoke {
            function,
            event,
            debug_port,
        } => {
            let template = settings.load_template()?;
            let function = function_config(&template, &function, &settings)?;
            let input = match event {
                Some(path) => std::fs::read(&path)
                    .with_context(|| format!("Failed to read event {}", path.display()))?,
                None => b"{}".to_vec(),
            };

            let runtime_api_port = free_local_port()?;
            let options = ContainerOptions {
                docker_network: settings.docker_network.clone(),
                debug_port,
                runtime_api_port: Some(runtime_api_port),
                ..Default::default()
            };
            let mut container = function.container(&options);
            let client = RuntimeApiClient::new(runtime_api_port);

            let manager = settings.container_manager()?;
            let outcome = tokio::select! {
                result = invoke_function(&manager, &mut container, &client, &function, Bytes::from(input)) => result,
                _ = tokio::signal::ctrl_c() => Err(anyhow!("Interrupted")),
            };

            if container.is_created() {
                match manager.logs(&container).await {
                    Ok(logs) => eprint!("{logs}"),
                    Err(e) => warn!(error = %e, "Failed to read container logs"),
                }
            }
            manager.stop(&mut container).await?;

            let result = outcome?;
            println!("{}", String::from_utf8_lossy(&result.payload));
            if let Some(error) = result.function_error {
                return Err(anyhow!("Function {} failed: {error}", function.function_name));
            }
        }
    }

    Ok(())
}

/// How long the Lambda runtime API gets to come up after the container starts
const RUNTIME_API_STARTUP: Duration = Duration::from_secs(10);

/// Start the function cold, then POST the event to its runtime API
async fn invoke_function(
    manager: &ContainerManager,
    container: &mut Container,
    client: &RuntimeApiClient,
    function: &FunctionConfig,
    event: Bytes,
) -> anyhow::Result<InvocationResult> {
    manager.run(container, None, StartMode::Cold).await?;
    info!(
        function = %function.function_name,
        container_id = container.id().unwrap_or_default(),
        url = %client.url(),
        "Invoking function"
    );

    // The emulator enforces the function timeout; leave it room to report it
    let timeout = Duration::from_secs(function.timeout.saturating_add(5));
    Ok(client.invoke(event, RUNTIME_API_STARTUP, timeout).await?)
}

/// Build a function's container settings from its template resource
fn function_config(
    template: &Template,
    logical_id: &str,
    settings: &Settings,
) -> anyhow::Result<FunctionConfig> {
    let resource = template
        .resources()
        .find(|r| r.logical_id == logical_id && r.is_function())
        .ok_or_else(|| anyhow!("No function named {logical_id} in the template"))?;

    let runtime: Runtime = resource
        .string_property("Runtime")
        .ok_or_else(|| anyhow!("Function {logical_id} has no Runtime"))?
        .parse()?;
    let handler = resource
        .string_property("Handler")
        .ok_or_else(|| anyhow!("Function {logical_id} has no Handler"))?;

    let code_path = match resource.string_property("CodeUri") {
        Some(uri) => settings.working_dir.join(uri),
        None => settings.working_dir.clone(),
    };

    let environment: HashMap<String, String> = resource
        .property("Environment")
        .and_then(|env| env.get("Variables"))
        .and_then(Value::as_object)
        .map(|vars| {
            vars.iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    let config = FunctionConfig {
        function_name: logical_id.to_string(),
        runtime,
        handler: handler.to_string(),
        code_path,
        memory_size: resource
            .property("MemorySize")
            .and_then(Value::as_u64)
            .unwrap_or(settings.memory_mb),
        timeout: resource
            .property("Timeout")
            .and_then(Value::as_u64)
            .unwrap_or(3),
        environment,
    };
    debug!(function = %logical_id, runtime = %config.runtime, "Resolved function");
    Ok(config)
}

fn render_apis(apis: &ApiCollection) -> String {
    let mut out = String::new();
    for api in apis {
        let _ = writeln!(out, "{} (stage {})", api.logical_id, api.stage_name);
        if !api.binary_media_types.is_empty() {
            let _ = writeln!(out, "  binary media types: {}", api.binary_media_types.join(", "));
        }
        if let Some(cors) = &api.cors {
            let _ = writeln!(
                out,
                "  cors: origin={} methods={}",
                cors.allow_origin, cors.allow_methods
            );
        }
        for route in &api.routes {
            let _ = writeln!(out, "  {route}");
        }
    }
    out
}
