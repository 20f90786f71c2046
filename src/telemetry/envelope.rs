//! Batch event envelope: one telemetry item per JSON line.
//!
//! Each line is `{"type": "<Discriminator>", "item": {...}}`. Decoding reads the
//! discriminator before committing to a shape and dispatches to exactly one concrete
//! item decoder; any other discriminator is rejected.

use crate::error::CodecError;
use crate::telemetry::types::{MetricTelemetry, Telemetry, TraceTelemetry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TRACE_TYPE: &str = "TraceTelemetry";
pub const METRIC_TYPE: &str = "MetricTelemetry";

/// A typed batch event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub item: Telemetry,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    item: &'a Telemetry,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(default)]
    item: Value,
}

impl Event {
    pub fn new(item: impl Into<Telemetry>) -> Self {
        Self { item: item.into() }
    }

    /// Discriminator written to the `type` member.
    pub fn event_type(&self) -> &'static str {
        self.item.kind()
    }

    pub fn into_item(self) -> Telemetry {
        self.item
    }
}

/// Encode a telemetry item as a single envelope line (no trailing newline).
pub fn encode(item: &Telemetry) -> Result<String, CodecError> {
    // JSON has no NaN or infinity; serde_json would write null, which never decodes.
    if let Telemetry::Metric(metric) = item {
        if !metric.value.is_finite() {
            return Err(CodecError::NonFiniteValue {
                name: metric.name.clone(),
                value: metric.value,
            });
        }
    }
    let envelope = EnvelopeRef {
        event_type: item.kind(),
        item,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode one envelope line into a typed event.
pub fn decode(line: &str) -> Result<Event, CodecError> {
    let raw: RawEnvelope = serde_json::from_str(line)?;
    let event_type = raw
        .event_type
        .filter(|t| !t.is_empty())
        .ok_or(CodecError::MissingType)?;

    let item = match event_type.as_str() {
        TRACE_TYPE => Telemetry::Trace(serde_json::from_value::<TraceTelemetry>(raw.item)?),
        METRIC_TYPE => Telemetry::Metric(serde_json::from_value::<MetricTelemetry>(raw.item)?),
        _ => return Err(CodecError::UnknownType(event_type)),
    };

    Ok(Event { item })
}
