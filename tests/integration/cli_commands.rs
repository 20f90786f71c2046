//! End-to-end command execution through the route table

use apmz::apm::{BufferPrinter, LinePrinter};
use apmz::cli::{map_error, Cli, Commands, RunContext};
use apmz::config::ApmzConfig;
use apmz::telemetry::{decode, Telemetry};
use clap::Parser;
use std::sync::Arc;
use tempfile::TempDir;

fn run(args: &[&str]) -> (Result<String, apmz::error::ApmzError>, Vec<String>) {
    let cli = Cli::try_parse_from(args).unwrap();
    let printer = Arc::new(BufferPrinter::new());
    let context = RunContext::new(
        ApmzConfig::default(),
        cli.output,
        printer.clone() as Arc<dyn LinePrinter>,
    )
    .unwrap();
    let result = context.execute(&cli.command);
    (result, printer.lines())
}

#[test]
fn test_metric_dry_run_with_tags() {
    let (result, lines) = run(&[
        "apmz", "metric", "-n", "latency", "-v", "-3.25", "-t", "region=west,tier=web", "-o",
    ]);
    assert_eq!(result.unwrap(), "");
    assert_eq!(lines.len(), 1);
    match decode(&lines[0]).unwrap().into_item() {
        Telemetry::Metric(metric) => {
            assert_eq!(metric.name, "latency");
            assert_eq!(metric.value, -3.25);
            assert_eq!(metric.properties.len(), 2);
            assert_eq!(metric.properties["tier"], "web");
        }
        other => panic!("unexpected item: {:?}", other),
    }
}

#[test]
fn test_trace_output_feeds_batch() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events");

    let (_, first) = run(&["apmz", "trace", "-n", "one", "-o"]);
    let (_, second) = run(&["apmz", "trace", "-n", "two", "-l", "2", "-o"]);
    std::fs::write(&path, format!("{}\n{}\n", first[0], second[0])).unwrap();

    let path_arg = path.to_string_lossy().to_string();
    let (result, replayed) = run(&["apmz", "batch", "-f", &path_arg, "-o"]);
    let summary: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
    assert_eq!(summary["Result"], "sent 2 events");
    assert_eq!(replayed, vec![first[0].clone(), second[0].clone()]);
}

#[test]
fn test_live_send_without_keys_reports_client_error() {
    let (result, lines) = run(&["apmz", "trace", "-n", "x"]);
    let err = result.unwrap_err();
    assert!(map_error(&err).starts_with("unable to create App Insights client"));
    assert!(lines.is_empty());
}

#[test]
fn test_bash_script_embeds_name_and_tags() {
    let (result, _) = run(&[
        "apmz", "bash", "-n", "deploy", "-t", "team=infra", "--api-keys", "key1",
    ]);
    let script = result.unwrap();
    assert!(script.contains("deploy"));
    assert!(script.contains("team=infra"));
    assert!(script.contains("trap exitAndFlush EXIT"));
}

#[test]
fn test_bash_disabled() {
    let (result, _) = run(&["apmz", "bash", "-d"]);
    let script = result.unwrap();
    assert!(script.contains("time_metric()"));
    assert!(!script.contains("apmz batch"));
}

#[test]
fn test_time_diff_resolutions() {
    let (ns, _) = run(&["apmz", "time", "diff", "-a", "5000000000", "-b", "2000000000", "-r", "nano"]);
    assert_eq!(ns.unwrap(), "3000000000");
    let (sec, _) = run(&["apmz", "time", "diff", "-a", "2000000000", "-b", "5000000000"]);
    assert_eq!(sec.unwrap(), "3.000000");
}

#[test]
fn test_version_and_uuid() {
    let (version, _) = run(&["apmz", "version"]);
    assert!(version.unwrap().starts_with("apmz "));
    let (id, _) = run(&["apmz", "uuid"]);
    assert!(uuid::Uuid::parse_str(&id.unwrap()).is_ok());
}

#[test]
fn test_metadata_attest_rejects_bad_nonce_before_io() {
    let mut config = ApmzConfig::default();
    // Nothing listens here; a request would fail differently.
    config.metadata.base_uri = "http://127.0.0.1:9/metadata/".to_string();
    let context = RunContext::new(config, false, Arc::new(BufferPrinter::new())).unwrap();
    let cli = Cli::try_parse_from(["apmz", "metadata", "attest", "-n", "abc"]).unwrap();

    let err = context.execute(&cli.command).unwrap_err();
    assert!(map_error(&err).contains("nonce must be between 1 and 10 digits"));
    assert!(matches!(cli.command, Commands::Metadata { .. }));
}
