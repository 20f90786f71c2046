//! CLI output: error mapping from domain errors to the single stderr line.

use crate::error::{ApmError, ApmzError, MetadataError};

/// Map an error to the message printed before exiting with status 1.
pub fn map_error(e: &ApmzError) -> String {
    match e {
        ApmzError::Apm(ApmError::MissingApiKeys) => {
            format!("unable to create App Insights client: {}", e)
        }
        ApmzError::Metadata(MetadataError::Cancelled) => "interrupted".to_string(),
        ApmzError::Metadata(inner) => format!("metadata request failed: {}", inner),
        _ => e.to_string(),
    }
}
