//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, an explicit
//! `--config` file, then `APMZ_*` environment variables. Command line flags are applied
//! on top by the CLI.

use crate::logging::LoggingConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApmzConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how telemetry is delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Application Insights instrumentation keys; every event goes to each of them
    #[serde(default)]
    pub api_keys: Vec<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How long to wait for channels to flush after a command
    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    crate::telemetry::DEFAULT_INGESTION_ENDPOINT.to_string()
}

fn default_close_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            endpoint: default_endpoint(),
            close_timeout_secs: default_close_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TelemetryConfig {
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Metadata service client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Dump every metadata request and response to stderr
    #[serde(default)]
    pub debug: bool,
}

fn default_base_uri() -> String {
    crate::metadata::METADATA_BASE_URI.to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            timeout_ms: default_timeout_ms(),
            debug: false,
        }
    }
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Telemetry(String),
    Metadata(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Telemetry(msg) => write!(f, "telemetry: {}", msg),
            ValidationError::Metadata(msg) => write!(f, "metadata: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ApmzConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.telemetry.api_keys.iter().any(|k| k.trim().is_empty()) {
            errors.push(ValidationError::Telemetry(
                "api keys cannot be empty".to_string(),
            ));
        }
        if let Err(e) = Url::parse(&self.telemetry.endpoint) {
            errors.push(ValidationError::Telemetry(format!(
                "invalid endpoint {:?}: {}",
                self.telemetry.endpoint, e
            )));
        }
        if self.telemetry.close_timeout_secs == 0 {
            errors.push(ValidationError::Telemetry(
                "close_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.telemetry.request_timeout_secs == 0 {
            errors.push(ValidationError::Telemetry(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if let Err(e) = Url::parse(&self.metadata.base_uri) {
            errors.push(ValidationError::Metadata(format!(
                "invalid base_uri {:?}: {}",
                self.metadata.base_uri, e
            )));
        }
        if self.metadata.timeout_ms == 0 {
            errors.push(ValidationError::Metadata(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
