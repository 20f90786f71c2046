//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with every default applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("telemetry.api_keys", Vec::<String>::new())?
        .set_default(
            "telemetry.endpoint",
            crate::telemetry::DEFAULT_INGESTION_ENDPOINT,
        )?
        .set_default("telemetry.close_timeout_secs", 30)?
        .set_default("telemetry.request_timeout_secs", 10)?
        .set_default("metadata.base_uri", crate::metadata::METADATA_BASE_URI)?
        .set_default("metadata.timeout_ms", 3000)?
        .set_default("metadata.debug", false)
}
