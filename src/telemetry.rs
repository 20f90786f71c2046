//! Telemetry domain: item schema, batch envelope codec, and delivery channels.

mod contracts;
mod types;

pub mod channel;
pub mod envelope;

pub use channel::{AppInsightsChannel, TelemetryChannel, DEFAULT_INGESTION_ENDPOINT};
pub use envelope::{decode, encode, Event, METRIC_TYPE, TRACE_TYPE};
pub use types::{MetricTelemetry, SeverityLevel, Telemetry, TraceTelemetry};
