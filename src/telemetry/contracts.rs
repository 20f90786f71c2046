//! Application Insights ingestion schema (the `/v2/track` envelope).

use crate::telemetry::types::Telemetry;
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::BTreeMap;

/// System variables for a telemetry item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    /// Type name of telemetry data item.
    pub(crate) name: String,

    /// Event date time when telemetry item was created, UTC ISO 8601 with trailing 'Z'.
    pub(crate) time: String,

    /// The application's instrumentation key.
    pub(crate) i_key: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) tags: BTreeMap<String, String>,

    pub(crate) data: Data,
}

#[derive(Debug, Serialize)]
#[serde(tag = "baseType", content = "baseData")]
pub(crate) enum Data {
    #[serde(rename = "MessageData")]
    Message(MessageData),
    #[serde(rename = "MetricData")]
    Metric(MetricData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageData {
    pub(crate) ver: i32,
    pub(crate) message: String,
    pub(crate) severity_level: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricData {
    pub(crate) ver: i32,
    pub(crate) metrics: Vec<DataPoint>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) properties: BTreeMap<String, String>,
}

/// Metric data single measurement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataPoint {
    pub(crate) name: String,
    /// 0 is a single measurement.
    pub(crate) kind: u8,
    pub(crate) value: f64,
    pub(crate) count: u32,
}

impl Envelope {
    pub(crate) fn from_telemetry(item: &Telemetry, instrumentation_key: &str) -> Self {
        let key_name = instrumentation_key.replace('-', "");
        let (kind, data) = match item {
            Telemetry::Trace(trace) => (
                "Message",
                Data::Message(MessageData {
                    ver: 2,
                    message: trace.message.clone(),
                    severity_level: trace.severity_level.as_str(),
                    properties: trace.properties.clone(),
                }),
            ),
            Telemetry::Metric(metric) => (
                "Metric",
                Data::Metric(MetricData {
                    ver: 2,
                    metrics: vec![DataPoint {
                        name: metric.name.clone(),
                        kind: 0,
                        value: metric.value,
                        count: 1,
                    }],
                    properties: metric.properties.clone(),
                }),
            ),
        };

        Self {
            name: format!("Microsoft.ApplicationInsights.{}.{}", key_name, kind),
            time: item
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            i_key: instrumentation_key.to_string(),
            tags: item.tags().clone(),
            data,
        }
    }
}
