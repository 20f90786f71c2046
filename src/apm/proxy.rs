//! Delivery proxy: prints envelopes in dry-run mode, otherwise fans out to channels.

use crate::apm::printer::LinePrinter;
use crate::apm::Apmer;
use crate::error::ApmError;
use crate::telemetry::{encode, AppInsightsChannel, Telemetry, TelemetryChannel};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Settings needed to construct the delivery proxy.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub api_keys: Vec<String>,
    pub dry_run: bool,
    pub endpoint: String,
    pub request_timeout: Duration,
}

/// Proxies tracked telemetry to a printer (dry-run) or to every configured channel.
pub struct ApmProxy {
    printer: Option<Arc<dyn LinePrinter>>,
    channels: Vec<Arc<dyn TelemetryChannel>>,
}

impl ApmProxy {
    pub fn new(
        printer: Option<Arc<dyn LinePrinter>>,
        channels: Vec<Arc<dyn TelemetryChannel>>,
    ) -> Self {
        Self { printer, channels }
    }

    /// Build from settings, one Application Insights channel per API key.
    ///
    /// Fails when running live without any key.
    pub fn from_settings(
        settings: &DeliverySettings,
        printer: Arc<dyn LinePrinter>,
    ) -> Result<Self, ApmError> {
        if settings.api_keys.is_empty() && !settings.dry_run {
            return Err(ApmError::MissingApiKeys);
        }

        let channels = settings
            .api_keys
            .iter()
            .map(|key| {
                AppInsightsChannel::new(
                    key.clone(),
                    settings.endpoint.clone(),
                    settings.request_timeout,
                )
                .map(|c| Arc::new(c) as Arc<dyn TelemetryChannel>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let printer = settings.dry_run.then_some(printer);
        debug!(
            destinations = channels.len(),
            dry_run = settings.dry_run,
            "Telemetry delivery configured"
        );
        Ok(Self::new(printer, channels))
    }

    pub fn is_dry_run(&self) -> bool {
        self.printer.is_some()
    }

    pub fn destination_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl Apmer for ApmProxy {
    fn track(&self, item: Telemetry) {
        if let Telemetry::Metric(metric) = &item {
            if !metric.value.is_finite() {
                error!(name = %metric.name, value = metric.value, "Dropping metric with non-finite value");
                return;
            }
        }

        if let Some(printer) = &self.printer {
            match encode(&item) {
                Ok(line) => {
                    if let Err(e) = printer.print_line(&line) {
                        error!(error = %e, "Failed to print event");
                    }
                }
                Err(e) => error!(error = %e, kind = item.kind(), "Failed to encode event"),
            }
            return;
        }

        for channel in &self.channels {
            channel.track(&item);
        }
    }

    async fn close(&self, deadline: Duration) {
        if self.channels.is_empty() {
            return;
        }

        // Spawned so that flushes still running at the deadline carry on in the background.
        let handles: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = Arc::clone(channel);
                tokio::spawn(async move {
                    if let Err(e) = channel.close().await {
                        warn!(channel = %channel.name(), error = %e, "Failed to flush telemetry");
                    }
                })
            })
            .collect();

        if tokio::time::timeout(deadline, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!(
                deadline_ms = deadline.as_millis() as u64,
                "Telemetry flush did not finish before the deadline"
            );
        }
    }
}
