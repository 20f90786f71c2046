//! Single entry point for loading configuration.

use super::merge::merge_policy;
use super::sources::global_file;
use super::ApmzConfig;
use config::{Environment, File};
use std::path::Path;
use tracing::debug;

pub const ENV_PREFIX: &str = "APMZ";

/// Loads `ApmzConfig` from defaults, files and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, the global file, `explicit` (required when given), then `APMZ_*` env vars.
    pub fn load(explicit: Option<&Path>) -> Result<ApmzConfig, config::ConfigError> {
        Self::load_with_env(explicit, true, Self::environment())
    }

    /// Defaults, `path` only, then env vars. The global file is skipped.
    pub fn load_from_file(path: &Path) -> Result<ApmzConfig, config::ConfigError> {
        Self::load_with_env(Some(path), false, Self::environment())
    }

    /// `APMZ_TELEMETRY__API_KEYS=k1,k2`, `APMZ_METADATA__DEBUG=true`, ...
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("telemetry.api_keys")
            .try_parsing(true)
    }

    pub fn load_with_env(
        explicit: Option<&Path>,
        include_global: bool,
        env: Environment,
    ) -> Result<ApmzConfig, config::ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;

        if include_global {
            builder = global_file::add_to_builder(builder)?;
        }

        if let Some(path) = explicit {
            debug!(config_path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder.add_source(env).build()?;
        config.try_deserialize()
    }
}
