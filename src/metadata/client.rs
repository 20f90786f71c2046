//! HTTP client for the instance metadata service.

use crate::error::MetadataError;
use crate::metadata::middleware::{
    HttpDump, HttpTransport, MetadataRequest, MetadataResponse, Middleware, Next, Transport,
};
use crate::metadata::scheduled_events::{AckEvents, ScheduledEvents};
use crate::metadata::types::{Attestation, IdentityToken, Instance, TokenRequest};
use crate::metadata::{
    Metadater, DEFAULT_TIMEOUT, IDENTITY_API_VERSION, INSTANCE_API_VERSION, METADATA_BASE_URI,
    SCHEDULED_EVENTS_API_VERSION,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

static NONCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,10}$").expect("valid nonce pattern"));

/// Client bound to a base URI, pinned API versions and client-level middleware.
///
/// Immutable once built. Each call may add its own middleware, which runs inside the
/// client-level stages.
pub struct MetadataClient {
    base_uri: Url,
    instance_api_version: String,
    identity_api_version: String,
    scheduled_events_api_version: String,
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn Middleware>>,
    debug: bool,
}

pub struct MetadataClientBuilder {
    base_uri: String,
    instance_api_version: String,
    identity_api_version: String,
    scheduled_events_api_version: String,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    middleware: Vec<Arc<dyn Middleware>>,
    debug: bool,
}

impl Default for MetadataClientBuilder {
    fn default() -> Self {
        Self {
            base_uri: METADATA_BASE_URI.to_string(),
            instance_api_version: INSTANCE_API_VERSION.to_string(),
            identity_api_version: IDENTITY_API_VERSION.to_string(),
            scheduled_events_api_version: SCHEDULED_EVENTS_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            middleware: Vec::new(),
            debug: false,
        }
    }
}

impl MetadataClientBuilder {
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn instance_api_version(mut self, version: impl Into<String>) -> Self {
        self.instance_api_version = version.into();
        self
    }

    pub fn identity_api_version(mut self, version: impl Into<String>) -> Self {
        self.identity_api_version = version.into();
        self
    }

    pub fn scheduled_events_api_version(mut self, version: impl Into<String>) -> Self {
        self.scheduled_events_api_version = version.into();
        self
    }

    /// Timeout of the default transport. Ignored when a transport is injected.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn http_client(self, client: reqwest::Client) -> Self {
        self.transport(Arc::new(HttpTransport::with_client(client)))
    }

    /// Append a client-level stage. Stages run in registration order.
    pub fn middleware(mut self, stage: Arc<dyn Middleware>) -> Self {
        self.middleware.push(stage);
        self
    }

    /// Dump every request and response to stderr.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn build(self) -> Result<MetadataClient, MetadataError> {
        let mut base = self.base_uri;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_uri =
            Url::parse(&base).map_err(|e| MetadataError::InvalidUri(format!("{}: {}", base, e)))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.timeout)?),
        };

        Ok(MetadataClient {
            base_uri,
            instance_api_version: self.instance_api_version,
            identity_api_version: self.identity_api_version,
            scheduled_events_api_version: self.scheduled_events_api_version,
            transport,
            middleware: self.middleware,
            debug: self.debug,
        })
    }
}

impl MetadataClient {
    pub fn builder() -> MetadataClientBuilder {
        MetadataClientBuilder::default()
    }

    /// Client with the default base URI, API versions and 3 second timeout.
    pub fn new() -> Result<Self, MetadataError> {
        Self::builder().build()
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, MetadataError> {
        let mut url = self
            .base_uri
            .join(path)
            .map_err(|e| MetadataError::InvalidUri(format!("{}: {}", path, e)))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// Run `request` through client stages, then per-call stages, then the dump stage
    /// when enabled. Cancelling `cancel` abandons the whole chain.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: MetadataRequest,
        per_call: &[Arc<dyn Middleware>],
    ) -> Result<MetadataResponse, MetadataError> {
        let mut stages: Vec<Arc<dyn Middleware>> = self
            .middleware
            .iter()
            .chain(per_call.iter())
            .cloned()
            .collect();
        if self.debug {
            stages.push(Arc::new(HttpDump::stderr()));
        }

        let method = request.method.clone();
        let uri = request.url.clone();
        let chain = Next::new(&stages, self.transport.as_ref()).run(request);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%method, %uri, "Metadata request cancelled");
                Err(MetadataError::Cancelled)
            }
            result = chain => result,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        url: Url,
        target: &'static str,
        per_call: &[Arc<dyn Middleware>],
    ) -> Result<T, MetadataError> {
        let response = self
            .execute(cancel, MetadataRequest::new(Method::GET, url), per_call)
            .await?;

        if !response.is_success() {
            warn!(uri = %response.url, status = response.status.as_u16(), "Metadata request failed");
            return Err(MetadataError::Status {
                method: Method::GET.to_string(),
                uri: response.url.to_string(),
                status: response.status.as_u16(),
                body: Some(response.body_text()),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|source| MetadataError::Decode { target, source })
    }
}

/// Empty means no nonce; anything else must be 1 to 10 digits.
pub fn validate_nonce(nonce: &str) -> Result<Option<&str>, MetadataError> {
    if nonce.is_empty() {
        return Ok(None);
    }
    if !NONCE.is_match(nonce) {
        return Err(MetadataError::InvalidNonce(nonce.to_string()));
    }
    Ok(Some(nonce))
}

#[async_trait]
impl Metadater for MetadataClient {
    async fn get_instance(
        &self,
        cancel: &CancellationToken,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<Instance, MetadataError> {
        let url = self.url("instance", &[("api-version", self.instance_api_version.as_str())])?;
        self.get_json(cancel, url, "Instance", middleware).await
    }

    async fn get_attestation(
        &self,
        cancel: &CancellationToken,
        nonce: &str,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<Attestation, MetadataError> {
        let nonce = validate_nonce(nonce)?;
        let mut query = vec![("api-version", self.instance_api_version.as_str())];
        if let Some(nonce) = nonce {
            query.push(("nonce", nonce));
        }
        let url = self.url("attested/document", &query)?;
        self.get_json(cancel, url, "Attestation", middleware).await
    }

    async fn get_scheduled_events(
        &self,
        cancel: &CancellationToken,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<ScheduledEvents, MetadataError> {
        let url = self.url(
            "scheduledevents",
            &[("api-version", self.scheduled_events_api_version.as_str())],
        )?;
        self.get_json(cancel, url, "ScheduledEvents", middleware).await
    }

    async fn ack_scheduled_events(
        &self,
        cancel: &CancellationToken,
        acks: &AckEvents,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<(), MetadataError> {
        let body = serde_json::to_vec(acks).map_err(MetadataError::Encode)?;
        let url = self.url(
            "scheduledevents",
            &[("api-version", self.scheduled_events_api_version.as_str())],
        )?;

        let request = MetadataRequest::new(Method::POST, url).with_body(body);
        let response = self.execute(cancel, request, middleware).await?;
        if !response.is_success() {
            return Err(MetadataError::Status {
                method: Method::POST.to_string(),
                uri: response.url.to_string(),
                status: response.status.as_u16(),
                body: None,
            });
        }

        debug!(acknowledged = acks.len(), "Scheduled events acknowledged");
        Ok(())
    }

    async fn get_identity_token(
        &self,
        cancel: &CancellationToken,
        request: &TokenRequest,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<IdentityToken, MetadataError> {
        if request.resource.is_empty() {
            return Err(MetadataError::MissingResource);
        }

        let mut query = vec![
            ("api-version", self.identity_api_version.clone()),
            ("resource", request.resource.clone()),
        ];
        if let Some(mi_res_id) = &request.managed_identity_id {
            let (client_id, object_id) = match (request.client_id, request.object_id) {
                (Some(client_id), Some(object_id)) => (client_id, object_id),
                _ => return Err(MetadataError::IncompleteManagedIdentity),
            };
            query.push(("mi_res_id", mi_res_id.clone()));
            query.push(("client_id", client_id.to_string()));
            query.push(("object_id", object_id.to_string()));
        }

        let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = self.url("identity/oauth2/token", &pairs)?;
        self.get_json(cancel, url, "IdentityToken", middleware).await
    }
}
