//! Azure instance metadata service.
//!
//! The service lives at a fixed non-routable address reachable only from inside the VM.
//! It describes the instance, signs attestation documents, announces scheduled
//! maintenance, and issues managed identity tokens.

pub mod client;
pub mod middleware;
pub mod scheduled_events;
pub mod types;

pub use client::{validate_nonce, MetadataClient, MetadataClientBuilder};
pub use middleware::{
    HttpDump, HttpTransport, MetadataRequest, MetadataResponse, Middleware, Next, Transport,
};
pub use scheduled_events::{AckEvent, AckEvents, EventStatus, EventType, ScheduledEvent, ScheduledEvents};
pub use types::{Attestation, Compute, IdentityToken, Instance, Network, TokenRequest};

use crate::error::MetadataError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const METADATA_BASE_URI: &str = "http://169.254.169.254/metadata/";
pub const INSTANCE_API_VERSION: &str = "2019-04-30";
pub const SCHEDULED_EVENTS_API_VERSION: &str = "2017-11-01";
pub const IDENTITY_API_VERSION: &str = "2018-02-01";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Operations exposed by the metadata service.
///
/// Each call races its middleware chain against `cancel` and accepts extra per-call
/// stages that run inside the client-level ones.
#[async_trait]
pub trait Metadater: Send + Sync {
    async fn get_instance(
        &self,
        cancel: &CancellationToken,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<Instance, MetadataError>;

    /// `nonce` may be empty; otherwise it must be 1 to 10 digits.
    async fn get_attestation(
        &self,
        cancel: &CancellationToken,
        nonce: &str,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<Attestation, MetadataError>;

    async fn get_scheduled_events(
        &self,
        cancel: &CancellationToken,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<ScheduledEvents, MetadataError>;

    async fn ack_scheduled_events(
        &self,
        cancel: &CancellationToken,
        acks: &AckEvents,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<(), MetadataError>;

    async fn get_identity_token(
        &self,
        cancel: &CancellationToken,
        request: &TokenRequest,
        middleware: &[Arc<dyn Middleware>],
    ) -> Result<IdentityToken, MetadataError>;
}
