//! Telemetry channels: destinations that accept tracked items and flush them on close.

use crate::error::ApmError;
use crate::telemetry::contracts::Envelope;
use crate::telemetry::types::Telemetry;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Default Application Insights ingestion endpoint.
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com/v2/track";

const CHANNEL_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A telemetry destination.
///
/// `track` never blocks on the network; `close` flushes everything tracked so far.
#[async_trait]
pub trait TelemetryChannel: Send + Sync {
    fn track(&self, item: &Telemetry);

    async fn close(&self) -> Result<(), ApmError>;

    /// Short label for logs (never the full key).
    fn name(&self) -> String;
}

/// Buffers items for one instrumentation key and posts them to the ingestion endpoint.
pub struct AppInsightsChannel {
    client: Client,
    endpoint: String,
    instrumentation_key: String,
    buffer: Mutex<Vec<Telemetry>>,
}

impl AppInsightsChannel {
    pub fn new(
        instrumentation_key: impl Into<String>,
        endpoint: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ApmError> {
        let client = Client::builder()
            .connect_timeout(CHANNEL_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApmError::Channel(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(instrumentation_key, endpoint, client))
    }

    /// Use a preconfigured client (proxy, TLS and timeout settings are the caller's).
    pub fn with_client(
        instrumentation_key: impl Into<String>,
        endpoint: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            instrumentation_key: instrumentation_key.into(),
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Number of items waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }
}

#[async_trait]
impl TelemetryChannel for AppInsightsChannel {
    fn track(&self, item: &Telemetry) {
        self.buffer.lock().push(item.clone());
    }

    async fn close(&self) -> Result<(), ApmError> {
        let items = std::mem::take(&mut *self.buffer.lock());
        if items.is_empty() {
            debug!(channel = %self.name(), "Nothing to flush");
            return Ok(());
        }

        let envelopes: Vec<Envelope> = items
            .iter()
            .map(|item| Envelope::from_telemetry(item, &self.instrumentation_key))
            .collect();

        let response = self
            .client
            .post(&self.endpoint)
            .json(&envelopes)
            .send()
            .await
            .map_err(|e| ApmError::Channel(format!("Failed to send telemetry: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApmError::Channel(format!(
                "ingestion rejected {} items: status {} - {}",
                envelopes.len(),
                status,
                body
            )));
        }

        info!(channel = %self.name(), items = envelopes.len(), "Flushed telemetry");
        Ok(())
    }

    fn name(&self) -> String {
        let prefix: String = self.instrumentation_key.chars().take(8).collect();
        format!("appinsights:{}", prefix)
    }
}
