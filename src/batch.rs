//! Batch upload: replay a newline-delimited envelope file through the APMer.
//!
//! Lines are forwarded in file order as soon as they decode. Blank lines are skipped.
//! The first undecodable line aborts the pass; events already forwarded stay forwarded.

use crate::apm::Apmer;
use crate::error::BatchError;
use crate::telemetry::decode;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Result of a batch upload pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub sent: usize,
}

/// Read the whole batch input from `path`, or from stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<String, BatchError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Reading batch file");
            Ok(std::fs::read_to_string(path)?)
        }
        None => {
            debug!("Reading batch events from stdin");
            let mut input = String::new();
            std::io::stdin().lock().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Decode every non-blank line of `input` and forward it to `apmer`.
pub fn upload(input: &str, apmer: &dyn Apmer) -> Result<BatchSummary, BatchError> {
    let mut sent = 0;
    for line in input.split('\n') {
        if line.trim().is_empty() {
            continue;
        }

        let event = decode(line).map_err(|source| BatchError::Decode {
            line: line.to_string(),
            source,
        })?;
        apmer.track(event.into_item());
        sent += 1;
    }

    info!(sent, "Batch events forwarded");
    Ok(BatchSummary { sent })
}

/// Read from `path` (or stdin) and upload.
pub fn upload_from(path: Option<&Path>, apmer: &dyn Apmer) -> Result<BatchSummary, BatchError> {
    let input = read_input(path)?;
    upload(&input, apmer)
}
