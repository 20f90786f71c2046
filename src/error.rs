//! Error types for the apmz telemetry and metadata client.

use thiserror::Error;

/// Batch envelope encoding and decoding errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("don't know how to decode type: {0}")]
    UnknownType(String),

    #[error("event is missing its type discriminator")]
    MissingType,

    #[error("metric {name:?} has a non-finite value: {value}")]
    NonFiniteValue { name: String, value: f64 },

    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Telemetry delivery errors
#[derive(Debug, Error)]
pub enum ApmError {
    #[error("must provide api-keys unless writing events to output")]
    MissingApiKeys,

    #[error("telemetry channel error: {0}")]
    Channel(String),
}

/// Batch upload errors
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("unable to read events: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to decode event: {source} -- \n{line}")]
    Decode {
        line: String,
        #[source]
        source: CodecError,
    },
}

/// Instance metadata service errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("nonce must be between 1 and 10 digits; got {0:?}")]
    InvalidNonce(String),

    #[error("resource uri must be supplied; see https://docs.microsoft.com/en-us/azure/active-directory/managed-identities-azure-resources/services-support-managed-identities")]
    MissingResource,

    #[error("if specifying a managed identity resource id, then client ID and object ID are required")]
    IncompleteManagedIdentity,

    #[error("{field} could not be parsed into a uuid: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: uuid::Error,
    },

    #[error("method: {method}, uri: {uri}, status: {status}{}", body_suffix(.body))]
    Status {
        method: String,
        uri: String,
        status: u16,
        body: Option<String>,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("unable to unmarshal to {target}: {source}")]
    Decode {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to marshal request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid metadata uri: {0}")]
    InvalidUri(String),

    #[error("metadata request cancelled")]
    Cancelled,
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_ref()
        .map(|b| format!(", body: {}", b))
        .unwrap_or_default()
}

/// Top-level error surfaced to the CLI
#[derive(Debug, Error)]
pub enum ApmzError {
    #[error(transparent)]
    Apm(#[from] ApmError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Command(String),
}

impl From<config::ConfigError> for ApmzError {
    fn from(err: config::ConfigError) -> Self {
        ApmzError::Config(err.to_string())
    }
}
