//! Batch upload through dry-run delivery

use apmz::apm::{ApmProxy, Apmer, BufferPrinter, DeliverySettings};
use apmz::batch::{upload, upload_from};
use apmz::error::BatchError;
use apmz::telemetry::{
    decode, encode, MetricTelemetry, SeverityLevel, Telemetry, TraceTelemetry,
    DEFAULT_INGESTION_ENDPOINT,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn dry_run_proxy() -> (ApmProxy, Arc<BufferPrinter>) {
    let printer = Arc::new(BufferPrinter::new());
    let settings = DeliverySettings {
        api_keys: Vec::new(),
        dry_run: true,
        endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
        request_timeout: Duration::from_secs(1),
    };
    let proxy = ApmProxy::from_settings(&settings, printer.clone()).unwrap();
    (proxy, printer)
}

fn sample_lines() -> Vec<String> {
    vec![
        encode(&TraceTelemetry::new("started", SeverityLevel::Information).into()).unwrap(),
        encode(&MetricTelemetry::new("duration", 12.5).into()).unwrap(),
        encode(
            &Telemetry::from(TraceTelemetry::new("done", SeverityLevel::Error))
                .with_properties([("exit".to_string(), "1".to_string())]),
        )
        .unwrap(),
    ]
}

#[test]
fn test_batch_file_replays_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("batch.json");
    let lines = sample_lines();
    std::fs::write(&path, format!("{}\n\n   \n{}\n{}\n", lines[0], lines[1], lines[2])).unwrap();

    let (proxy, printer) = dry_run_proxy();
    let summary = upload_from(Some(&path), &proxy).unwrap();
    assert_eq!(summary.sent, 3);

    let printed = printer.lines();
    assert_eq!(printed.len(), 3);
    for (printed, original) in printed.iter().zip(&lines) {
        assert_eq!(decode(printed).unwrap(), decode(original).unwrap());
    }
}

#[test]
fn test_bad_line_stops_after_forwarding_earlier_events() {
    let lines = sample_lines();
    let input = format!("{}\nnot json\n{}\n", lines[0], lines[1]);

    let (proxy, printer) = dry_run_proxy();
    let err = upload(&input, &proxy).unwrap_err();
    match err {
        BatchError::Decode { line, .. } => assert_eq!(line, "not json"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(printer.lines().len(), 1);
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let (proxy, _) = dry_run_proxy();
    let err = upload_from(Some(&temp_dir.path().join("absent")), &proxy).unwrap_err();
    assert!(matches!(err, BatchError::Io(_)));
}

#[tokio::test]
async fn test_dry_run_close_is_immediate() {
    let (proxy, _) = dry_run_proxy();
    upload(&sample_lines().join("\n"), &proxy).unwrap();
    tokio::time::timeout(Duration::from_millis(500), proxy.close(Duration::from_secs(30)))
        .await
        .unwrap();
}
