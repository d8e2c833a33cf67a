//! Settings loading
//!
//! Runner and server settings are extracted with figment from `LLAMA_*`
//! environment variables. Empty values count as unset, so a blank
//! `LLAMA_CLI_PATH=` still fails fast as a missing field.

use crate::config::capabilities::EnabledEndpoints;
use crate::config::env_names::LLAMA_PREFIX;
use crate::config::ConfigError;
use crate::inference::params::NumaMode;
use figment::providers::Env;
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default process timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

const DEFAULT_CONTEXT_SIZE: u32 = 2048;
const DEFAULT_GPU_LAYERS: u32 = 2;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

/// Resolved, read-only configuration for building llama invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Path to the llama-cli binary
    pub cli_path: PathBuf,
    /// Path to the GGUF model file
    pub model_path: PathBuf,
    /// Default context window size (`--ctx-size`)
    #[serde(default = "default_context_size")]
    pub context_size: u32,
    /// Default number of layers offloaded to the GPU (`--gpu-layers`)
    #[serde(default = "default_gpu_layers")]
    pub gpu_layers: u32,
    /// Default primary GPU index (`--main-gpu`)
    #[serde(default)]
    pub main_gpu: u32,
    /// Default NUMA mode (`--numa`)
    #[serde(default)]
    pub numa: NumaMode,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub no_display_prompt: bool,
    /// Wall-clock limit for a single invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Never spawn the binary; every invocation returns the placeholder
    #[serde(default)]
    pub dry_run: bool,
    /// Maximum number of llama processes running at once
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

fn default_context_size() -> u32 {
    DEFAULT_CONTEXT_SIZE
}

fn default_gpu_layers() -> u32 {
    DEFAULT_GPU_LAYERS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RunnerConfig {
    /// Config for the given binary and model with every other field defaulted
    pub fn new(cli_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            cli_path: cli_path.into(),
            model_path: model_path.into(),
            context_size: DEFAULT_CONTEXT_SIZE,
            gpu_layers: DEFAULT_GPU_LAYERS,
            main_gpu: 0,
            numa: NumaMode::default(),
            verbose: false,
            no_display_prompt: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dry_run: false,
            max_concurrent: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load from `LLAMA_*` environment variables and validate
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: RunnerConfig = Figment::from(llama_env()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every invocation fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.context_size == 0 {
            return Err(ConfigError::Invalid(
                "context_size must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent == Some(0) {
            return Err(ConfigError::Invalid(
                "max_concurrent must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP bind settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Figment::from(llama_env().only(&["host", "port"])).extract()?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub runner: RunnerConfig,
    pub endpoints: EnabledEndpoints,
}

impl AppSettings {
    /// Load every section from the environment, failing on the first error
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerSettings::from_env()?,
            runner: RunnerConfig::from_env()?,
            endpoints: EnabledEndpoints::from_env()?,
        })
    }

    /// Log the resolved configuration once at startup
    pub fn log_summary(&self) {
        tracing::info!(
            cli_path = %self.runner.cli_path.display(),
            model_path = %self.runner.model_path.display(),
            context_size = self.runner.context_size,
            gpu_layers = self.runner.gpu_layers,
            main_gpu = self.runner.main_gpu,
            numa = %self.runner.numa,
            timeout_secs = self.runner.timeout_secs,
            dry_run = self.runner.dry_run,
            "Runner configured"
        );
        tracing::info!(
            endpoints = ?self.endpoints.ids(),
            bind = %self.server.bind_address(),
            "Server configured"
        );
    }
}

/// `LLAMA_*` provider that skips variables set to an empty string
fn llama_env() -> Env {
    Env::prefixed(LLAMA_PREFIX).filter_map(|key| {
        let full_key = format!("{}{}", LLAMA_PREFIX, key.as_str().to_ascii_uppercase());
        match std::env::var(&full_key) {
            Ok(value) if !value.trim().is_empty() => Some(key.into()),
            _ => None,
        }
    })
}
