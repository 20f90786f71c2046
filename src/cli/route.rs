//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::apm::{ApmProxy, Apmer, ApmerCell, DeliverySettings, LinePrinter, StdoutPrinter};
use crate::batch;
use crate::cli::help::{command_name, tracks_telemetry};
use crate::cli::parse::{Cli, Commands, EventsCommands, MetadataCommands, OutputFormat, TimeCommands};
use crate::cli::presentation::{
    format_batch_summary, format_scheduled_events_text, format_time_diff, format_version,
    to_pretty_json,
};
use crate::config::ApmzConfig;
use crate::error::{ApmzError, MetadataError};
use crate::metadata::{AckEvents, MetadataClient, Metadater, TokenRequest};
use crate::shell::{self, ScriptOptions};
use crate::telemetry::{MetricTelemetry, SeverityLevel, Telemetry, TraceTelemetry};
use chrono::Utc;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runtime context for CLI execution: resolved config, lazily-built services, and the
/// async runtime that drives them.
pub struct RunContext {
    config: ApmzConfig,
    delivery: DeliverySettings,
    apmer: ApmerCell,
    metadater: OnceCell<Arc<dyn Metadater>>,
    runtime: Runtime,
    cancel: CancellationToken,
}

impl RunContext {
    /// Build from parsed flags and loaded config. `--api-keys` replaces configured keys.
    pub fn from_cli(cli: &Cli, mut config: ApmzConfig) -> Result<Self, ApmzError> {
        let keys: Vec<String> = cli
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if !keys.is_empty() {
            config.telemetry.api_keys = keys;
        }
        Self::new(config, cli.output, Arc::new(StdoutPrinter))
    }

    /// Build from a resolved config. `dry_run` prints envelopes to `printer` instead of sending.
    pub fn new(
        config: ApmzConfig,
        dry_run: bool,
        printer: Arc<dyn LinePrinter>,
    ) -> Result<Self, ApmzError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApmzError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let delivery = DeliverySettings {
            api_keys: config.telemetry.api_keys.clone(),
            dry_run,
            endpoint: config.telemetry.endpoint.clone(),
            request_timeout: config.telemetry.request_timeout(),
        };

        let settings = delivery.clone();
        let apmer = ApmerCell::new(move || {
            ApmProxy::from_settings(&settings, Arc::clone(&printer))
                .map(|proxy| Arc::new(proxy) as Arc<dyn Apmer>)
        });

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            config,
            delivery,
            apmer,
            metadater: OnceCell::new(),
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the telemetry delivery (tests, embedding).
    pub fn with_apmer_cell(mut self, apmer: ApmerCell) -> Self {
        self.apmer = apmer;
        self
    }

    /// Use `metadater` instead of an HTTP client built from config.
    pub fn with_metadater(self, metadater: Arc<dyn Metadater>) -> Self {
        // A fresh cell cannot be full, so this set always succeeds.
        let _ = self.metadater.set(metadater);
        self
    }

    pub fn config(&self) -> &ApmzConfig {
        &self.config
    }

    /// Token cancelled on Ctrl-C; in-flight metadata calls watch it.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute a CLI command via the single route table, then close the APMer.
    pub fn execute(&self, command: &Commands) -> Result<String, ApmzError> {
        let name = command_name(command);
        let started = Instant::now();
        debug!(command = %name, telemetry = tracks_telemetry(command), "Executing command");

        let result = self.runtime.block_on(async {
            let interrupt = self.cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted; cancelling in-flight requests");
                    interrupt.cancel();
                }
            });

            let result = self.execute_inner(command).await;
            self.apmer.close(self.config.telemetry.close_timeout()).await;
            watcher.abort();
            result
        });

        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApmzError> {
        match command {
            Commands::Trace { name, level, tags } => {
                let severity = SeverityLevel::try_from(*level).map_err(ApmzError::Command)?;
                let item = Telemetry::from(TraceTelemetry::new(name.clone(), severity))
                    .with_properties(tags.iter().cloned());
                self.apmer.get()?.track(item);
                Ok(String::new())
            }
            Commands::Metric { name, value, tags } => {
                let item = Telemetry::from(MetricTelemetry::new(name.clone(), *value))
                    .with_properties(tags.iter().cloned());
                self.apmer.get()?.track(item);
                Ok(String::new())
            }
            Commands::Batch { file } => {
                let apmer = self.apmer.get()?;
                let summary = batch::upload_from(file.as_deref(), apmer.as_ref())?;
                format_batch_summary(&summary)
            }
            Commands::Bash {
                disabled,
                name,
                default_tags,
            } => {
                let options = ScriptOptions {
                    disabled: *disabled,
                    script_name: name.clone(),
                    default_tags: default_tags.iter().cloned().collect(),
                    api_keys: self.delivery.api_keys.clone(),
                };
                if options.needs_key_warning() {
                    eprintln!("{}", shell::MISSING_KEYS_WARNING);
                }
                Ok(shell::render(&options))
            }
            Commands::Time { command } => match command {
                TimeCommands::Unixnano => Utc::now()
                    .timestamp_nanos_opt()
                    .map(|nanos| nanos.to_string())
                    .ok_or_else(|| {
                        ApmzError::Command("current time is out of range for unixnano".to_string())
                    }),
                TimeCommands::Diff {
                    first,
                    second,
                    resolution,
                } => Ok(format_time_diff(*first, *second, *resolution)),
            },
            Commands::Uuid => Ok(Uuid::new_v4().to_string()),
            Commands::Version => Ok(format_version()),
            Commands::Metadata { command } => self.handle_metadata_command(command).await,
        }
    }

    async fn handle_metadata_command(&self, command: &MetadataCommands) -> Result<String, ApmzError> {
        let metadater = self.metadater()?;
        let cancel = &self.cancel;
        match command {
            MetadataCommands::Instance => {
                let instance = metadater.get_instance(cancel, &[]).await?;
                to_pretty_json(&instance)
            }
            MetadataCommands::Attest { nonce } => {
                let attestation = metadater.get_attestation(cancel, nonce, &[]).await?;
                to_pretty_json(&attestation)
            }
            MetadataCommands::Events { command } => match command {
                EventsCommands::Get { format } => {
                    let events = metadater.get_scheduled_events(cancel, &[]).await?;
                    match format {
                        OutputFormat::Json => to_pretty_json(&events),
                        OutputFormat::Text => Ok(format_scheduled_events_text(&events)),
                    }
                }
                EventsCommands::Ack { event_ids } => {
                    let acks = AckEvents::from_ids(event_ids.iter().cloned());
                    metadater.ack_scheduled_events(cancel, &acks, &[]).await?;
                    Ok(String::new())
                }
            },
            MetadataCommands::Token {
                resource,
                mi_res,
                object_id,
                client_id,
            } => {
                let request = TokenRequest {
                    resource: resource.clone(),
                    managed_identity_id: mi_res.clone().filter(|id| !id.is_empty()),
                    client_id: parse_identifier("client ID", client_id.as_deref())?,
                    object_id: parse_identifier("object ID", object_id.as_deref())?,
                };
                let token = metadater.get_identity_token(cancel, &request, &[]).await?;
                to_pretty_json(&token)
            }
        }
    }

    fn metadater(&self) -> Result<Arc<dyn Metadater>, MetadataError> {
        self.metadater
            .get_or_try_init(|| {
                let settings = &self.config.metadata;
                let client = MetadataClient::builder()
                    .base_uri(settings.base_uri.clone())
                    .timeout(settings.timeout())
                    .debug(settings.debug)
                    .build()?;
                Ok(Arc::new(client) as Arc<dyn Metadater>)
            })
            .map(Arc::clone)
    }
}

fn parse_identifier(field: &'static str, raw: Option<&str>) -> Result<Option<Uuid>, MetadataError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|source| MetadataError::InvalidIdentifier { field, source })
        })
        .transpose()
}
