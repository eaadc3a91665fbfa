//! Application configuration.
//!
//! Loaded from YAML files and environment variables. Handlers are code, so
//! configuration only describes *where* events come from (bindings), how the
//! router resolves several matches, and the ambient knobs (logging, AWS
//! endpoint, compensation retry).

use serde::Deserialize;

pub use crate::router::SourceKind;
use crate::router::RoutingPolicy;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "lambda-dispatch.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "LAMBDA_DISPATCH_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "LAMBDA_DISPATCH";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "LAMBDA_DISPATCH_LOG";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub log: LogConfig,
    /// AWS client configuration.
    pub aws: AwsConfig,
    /// Routing policy configuration.
    pub routing: RoutingConfig,
    /// Compensation retry configuration.
    pub compensation: CompensationConfig,
    /// Source bindings.
    pub bindings: Vec<BindingConfig>,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `lambda-dispatch.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables `LAMBDA_DISPATCH__<SECTION>__<KEY>`; the double
    ///    underscore keeps `LOG_ENV_VAR` and `CONFIG_ENV_VAR` out of the tree
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config: Config = config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for binding in &self.bindings {
            if binding.kind == SourceKind::LogStream && binding.topic.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "stream binding for '{}' requires a topic",
                    binding.source
                )));
            }
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line (CloudWatch-friendly).
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `LOG_ENV_VAR` is unset.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// AWS client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Fallback region. Queue clients use the region from the queue ARN.
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack or testing).
    pub endpoint_url: Option<String>,
}

/// Routing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub policy: RoutingPolicy,
}

/// Retry settings for the compensation delete call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompensationConfig {
    /// Total attempts including the first.
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }
}

/// A binding declared in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingConfig {
    pub kind: SourceKind,
    /// Source resource identifier (topic, queue, cluster or rule ARN).
    pub source: String,
    /// Logical topic filter for log-stream bindings.
    #[serde(default)]
    pub topic: Option<String>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
