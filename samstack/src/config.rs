//! Configuration management

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub docker: DockerConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_template_path")]
    pub path: PathBuf,

    /// Base directory for relative `DefinitionUri` and code paths
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: default_template_path(),
            working_dir: default_working_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub skip_pull_image: bool,

    #[serde(default)]
    pub network: Option<String>,

    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            skip_pull_image: false,
            network: None,
            memory_mb: default_memory_mb(),
        }
    }
}

fn default_template_path() -> PathBuf {
    PathBuf::from("template.yaml")
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_memory_mb() -> u64 {
    128
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `<name>.{toml,yaml,json}` and `SAMSTACK_*`
    /// environment variables (`SAMSTACK_DOCKER__NETWORK` for nested keys)
    pub fn load(name: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(config::Environment::with_prefix("SAMSTACK").separator("__"))
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }
}
