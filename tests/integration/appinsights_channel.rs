//! Application Insights channel delivery against a local HTTP stub

use super::test_utils::StubServer;
use apmz::error::ApmError;
use apmz::telemetry::{
    AppInsightsChannel, MetricTelemetry, SeverityLevel, Telemetry, TelemetryChannel,
    TraceTelemetry,
};
use std::time::Duration;

const KEY: &str = "0000-1111-2222";

fn channel_for(server: &StubServer) -> AppInsightsChannel {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .no_proxy()
        .build()
        .unwrap();
    AppInsightsChannel::with_client(KEY, server.url("v2/track"), client)
}

#[tokio::test]
async fn test_close_posts_buffered_envelopes() {
    let server = StubServer::start(200, r#"{"itemsReceived":2,"itemsAccepted":2,"errors":[]}"#).await;
    let channel = channel_for(&server);

    channel.track(
        &Telemetry::from(TraceTelemetry::new("deploy started", SeverityLevel::Warning))
            .with_properties([("env".to_string(), "prod".to_string())]),
    );
    channel.track(&MetricTelemetry::new("duration", 41.5).into());
    channel.close().await.unwrap();
    assert_eq!(channel.pending(), 0);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].request_line.starts_with("POST /v2/track "));
    assert_eq!(requests[0].header("content-type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    let envelopes = body.as_array().unwrap();
    assert_eq!(envelopes.len(), 2);

    let trace = &envelopes[0];
    assert_eq!(trace["name"], "Microsoft.ApplicationInsights.000011112222.Message");
    assert_eq!(trace["iKey"], KEY);
    assert_eq!(trace["data"]["baseType"], "MessageData");
    assert_eq!(trace["data"]["baseData"]["message"], "deploy started");
    assert_eq!(trace["data"]["baseData"]["severityLevel"], "Warning");
    assert_eq!(trace["data"]["baseData"]["properties"]["env"], "prod");

    let metric = &envelopes[1];
    assert_eq!(metric["name"], "Microsoft.ApplicationInsights.000011112222.Metric");
    assert_eq!(metric["data"]["baseType"], "MetricData");
    assert_eq!(metric["data"]["baseData"]["metrics"][0]["name"], "duration");
    assert_eq!(metric["data"]["baseData"]["metrics"][0]["value"], 41.5);
}

#[tokio::test]
async fn test_rejected_flush_is_channel_error() {
    let server = StubServer::start(500, "ingestion unavailable").await;
    let channel = channel_for(&server);

    channel.track(&MetricTelemetry::new("m", 1.0).into());
    let err = channel.close().await.unwrap_err();
    match err {
        ApmError::Channel(message) => {
            assert!(message.contains("500"), "{message}");
            assert!(message.contains("ingestion unavailable"), "{message}");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_empty_close_sends_nothing() {
    let server = StubServer::start(200, "{}").await;
    let channel = channel_for(&server);
    channel.close().await.unwrap();
    assert!(server.requests().is_empty());
}
