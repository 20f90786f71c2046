//! CLI presentation: JSON and table rendering of command results.

use crate::batch::BatchSummary;
use crate::cli::parse::Resolution;
use crate::error::ApmzError;
use crate::metadata::ScheduledEvents;
use comfy_table::Table;
use serde::Serialize;

/// Pretty JSON, the default rendering for metadata documents.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, ApmzError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApmzError::Command(format!("unable to render output: {}", e)))
}

/// `{"Result": "sent N events"}`
pub fn format_batch_summary(summary: &BatchSummary) -> Result<String, ApmzError> {
    to_pretty_json(&serde_json::json!({
        "Result": format!("sent {} events", summary.sent)
    }))
}

pub fn format_scheduled_events_text(events: &ScheduledEvents) -> String {
    if events.events.is_empty() {
        return format!(
            "No scheduled events (document incarnation {})",
            events.document_incarnation
        );
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Event ID", "Type", "Status", "Not Before", "Resources"]);
    for event in &events.events {
        let not_before = event
            .not_before
            .map(|ts| ts.to_rfc2822())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            event.id.clone(),
            event.event_type.to_string(),
            event.status.to_string(),
            not_before,
            event.resources.join(", "),
        ]);
    }
    format!(
        "Document incarnation: {}\n{}",
        events.document_incarnation, table
    )
}

/// Absolute difference of two unixnano times. `sec` keeps six decimals; the integer
/// resolutions truncate.
pub fn format_time_diff(first: i64, second: i64, resolution: Resolution) -> String {
    let nanos = (i128::from(first) - i128::from(second)).unsigned_abs();
    match resolution {
        Resolution::Nano => nanos.to_string(),
        Resolution::Micro => (nanos / 1_000).to_string(),
        Resolution::Ms => (nanos / 1_000_000).to_string(),
        Resolution::Sec => format!("{:.6}", nanos as f64 / 1e9),
    }
}

pub fn format_version() -> String {
    match option_env!("APMZ_GIT_COMMIT") {
        Some(commit) if !commit.is_empty() => {
            format!("apmz {} ({})", env!("CARGO_PKG_VERSION"), commit)
        }
        _ => format!("apmz {}", env!("CARGO_PKG_VERSION")),
    }
}
