//! Telemetry item schema: traces and metrics.
//!
//! Field names follow the PascalCase layout that existing batch files use, so files
//! written by older releases of the tool still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trace severity, stored as its numeric level on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeverityLevel {
    #[default]
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl SeverityLevel {
    /// Name used by the Application Insights ingestion schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Verbose => "Verbose",
            SeverityLevel::Information => "Information",
            SeverityLevel::Warning => "Warning",
            SeverityLevel::Error => "Error",
            SeverityLevel::Critical => "Critical",
        }
    }
}

impl From<SeverityLevel> for u8 {
    fn from(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Verbose => 0,
            SeverityLevel::Information => 1,
            SeverityLevel::Warning => 2,
            SeverityLevel::Error => 3,
            SeverityLevel::Critical => 4,
        }
    }
}

impl TryFrom<u8> for SeverityLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(SeverityLevel::Verbose),
            1 => Ok(SeverityLevel::Information),
            2 => Ok(SeverityLevel::Warning),
            3 => Ok(SeverityLevel::Error),
            4 => Ok(SeverityLevel::Critical),
            other => Err(format!("invalid severity level {} (must be 0-4)", other)),
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trace message (the `traces` table in Application Insights)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceTelemetry {
    pub message: String,
    #[serde(default)]
    pub severity_level: SeverityLevel,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl TraceTelemetry {
    pub fn new(message: impl Into<String>, severity_level: SeverityLevel) -> Self {
        Self {
            message: message.into(),
            severity_level,
            timestamp: Utc::now(),
            tags: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// A single custom metric measurement (the `customMetrics` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricTelemetry {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl MetricTelemetry {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: Utc::now(),
            tags: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// Closed set of telemetry kinds the tool can track and buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Telemetry {
    Trace(TraceTelemetry),
    Metric(MetricTelemetry),
}

impl Telemetry {
    /// Wire discriminator for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Telemetry::Trace(_) => super::envelope::TRACE_TYPE,
            Telemetry::Metric(_) => super::envelope::METRIC_TYPE,
        }
    }

    pub fn properties_mut(&mut self) -> &mut BTreeMap<String, String> {
        match self {
            Telemetry::Trace(t) => &mut t.properties,
            Telemetry::Metric(m) => &mut m.properties,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Telemetry::Trace(t) => t.timestamp,
            Telemetry::Metric(m) => m.timestamp,
        }
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        match self {
            Telemetry::Trace(t) => &t.tags,
            Telemetry::Metric(m) => &m.tags,
        }
    }

    /// Attach custom properties (the CLI `--tags` flag).
    pub fn with_properties<I>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.properties_mut().extend(properties);
        self
    }
}

impl From<TraceTelemetry> for Telemetry {
    fn from(trace: TraceTelemetry) -> Self {
        Telemetry::Trace(trace)
    }
}

impl From<MetricTelemetry> for Telemetry {
    fn from(metric: MetricTelemetry) -> Self {
        Telemetry::Metric(metric)
    }
}
