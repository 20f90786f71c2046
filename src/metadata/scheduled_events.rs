//! Scheduled maintenance events and the acknowledgment payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Impact a scheduled event has on the VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Paused for a few seconds; memory and open files are kept.
    Freeze,
    /// Rebooted; non-persistent memory is lost.
    Reboot,
    /// Moved to another node; ephemeral disks are lost.
    Redeploy,
    /// Spot VM is being deleted; ephemeral disks are lost.
    Preempt,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Freeze => "Freeze",
            EventType::Reboot => "Reboot",
            EventType::Redeploy => "Redeploy",
            EventType::Preempt => "Preempt",
            EventType::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// The service never reports completion; finished events simply disappear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Scheduled,
    Started,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Scheduled => "Scheduled",
            EventStatus::Started => "Started",
            EventStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Document returned by `metadata/scheduledevents`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvents {
    #[serde(rename = "DocumentIncarnation", default)]
    pub document_incarnation: i64,
    #[serde(rename = "Events", default)]
    pub events: Vec<ScheduledEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    #[serde(rename = "EventId")]
    pub id: String,
    #[serde(rename = "EventType")]
    pub event_type: EventType,
    #[serde(rename = "ResourceType", default)]
    pub resource_type: String,
    #[serde(rename = "Resources", default)]
    pub resources: Vec<String>,
    #[serde(rename = "EventStatus")]
    pub status: EventStatus,
    /// Empty once the event has started.
    #[serde(rename = "NotBefore", default, with = "rfc1123")]
    pub not_before: Option<DateTime<Utc>>,
}

/// Payload POSTed to acknowledge (start) scheduled events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEvents {
    #[serde(rename = "StartRequests")]
    pub start_requests: Vec<AckEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEvent {
    #[serde(rename = "EventId")]
    pub event_id: String,
}

impl AckEvents {
    /// One start request per id, in the given order.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            start_requests: ids
                .into_iter()
                .map(|id| AckEvent {
                    event_id: id.into(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.start_requests.len()
    }
}

/// `Mon, 19 Sep 2016 18:29:47 GMT`; the empty string maps to `None`.
mod rfc1123 {
    use super::*;

    const FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }
        DateTime::parse_from_rfc2822(raw.trim())
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}
