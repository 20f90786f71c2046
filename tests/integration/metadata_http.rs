//! Metadata client against a local HTTP stub

use super::test_utils::StubServer;
use apmz::error::MetadataError;
use apmz::metadata::{AckEvents, EventType, MetadataClient, Metadater, TokenRequest};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn client_for(server: &StubServer) -> MetadataClient {
    MetadataClient::builder()
        .base_uri(server.base_uri.clone())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_instance_request_carries_metadata_header() {
    let server = StubServer::start(
        200,
        r#"{"compute":{"vmId":"abc-123","location":"westus2","vmSize":"Standard_D2s_v3"},
            "network":{"interface":[{"macAddress":"000D3A00AA11","ipv4":{"ipAddress":[{"privateIpAddress":"10.0.0.4","publicIpAddress":""}],"subnet":[{"address":"10.0.0.0","prefix":"24"}]},"ipv6":{"ipAddress":[]}}]}}"#,
    )
    .await;
    let client = client_for(&server);

    let instance = client
        .get_instance(&CancellationToken::new(), &[])
        .await
        .unwrap();
    let compute = instance.compute.unwrap();
    assert_eq!(compute.vm_id.as_deref(), Some("abc-123"));
    assert_eq!(compute.location.as_deref(), Some("westus2"));
    let network = instance.network.unwrap();
    assert_eq!(network.interfaces[0].mac_address, "000D3A00AA11");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0]
        .request_line
        .starts_with("GET /metadata/instance?api-version=2019-04-30 "));
    assert_eq!(requests[0].header("metadata"), Some("true"));
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_attestation_with_nonce() {
    let server = StubServer::start(200, r#"{"encoding":"pkcs7","signature":"MIIF..."}"#).await;
    let client = client_for(&server);

    let attestation = client
        .get_attestation(&CancellationToken::new(), "1234567890", &[])
        .await
        .unwrap();
    assert_eq!(attestation.encoding, "pkcs7");
    assert_eq!(attestation.signature, "MIIF...");

    let requests = server.requests();
    assert!(requests[0]
        .request_line
        .contains("/metadata/attested/document?api-version=2019-04-30&nonce=1234567890"));
}

#[tokio::test]
async fn test_invalid_nonce_never_reaches_server() {
    let server = StubServer::start(200, "{}").await;
    let client = client_for(&server);

    let err = client
        .get_attestation(&CancellationToken::new(), "12345678901", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::InvalidNonce(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_scheduled_events_decoded() {
    let server = StubServer::start(
        200,
        r#"{"DocumentIncarnation":2,"Events":[{"EventId":"602d9444-d2cd-49c7-8624-8643e7171297","EventType":"Reboot","ResourceType":"VirtualMachine","Resources":["FrontEnd_IN_0"],"EventStatus":"Scheduled","NotBefore":"Mon, 19 Sep 2016 18:29:47 GMT"}]}"#,
    )
    .await;
    let client = client_for(&server);

    let events = client
        .get_scheduled_events(&CancellationToken::new(), &[])
        .await
        .unwrap();
    assert_eq!(events.document_incarnation, 2);
    assert_eq!(events.events.len(), 1);
    assert_eq!(events.events[0].event_type, EventType::Reboot);
    assert!(events.events[0].not_before.is_some());

    assert!(server.requests()[0]
        .request_line
        .starts_with("GET /metadata/scheduledevents?api-version=2017-11-01 "));
}

#[tokio::test]
async fn test_ack_posts_start_requests() {
    let server = StubServer::start(200, "").await;
    let client = client_for(&server);

    client
        .ack_scheduled_events(
            &CancellationToken::new(),
            &AckEvents::from_ids(["evt-1", "evt-2"]),
            &[],
        )
        .await
        .unwrap();

    let requests = server.requests();
    assert!(requests[0].request_line.starts_with("POST /metadata/scheduledevents"));
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"StartRequests": [{"EventId": "evt-1"}, {"EventId": "evt-2"}]})
    );
}

#[tokio::test]
async fn test_ack_failure_reports_status() {
    let server = StubServer::start(400, "bad request").await;
    let client = client_for(&server);

    let err = client
        .ack_scheduled_events(&CancellationToken::new(), &AckEvents::from_ids(["x"]), &[])
        .await
        .unwrap_err();
    match err {
        MetadataError::Status {
            method,
            status,
            body,
            ..
        } => {
            assert_eq!(method, "POST");
            assert_eq!(status, 400);
            assert!(body.is_none());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_failure_includes_body() {
    let server = StubServer::start(404, "no such thing").await;
    let client = client_for(&server);

    let err = client
        .get_instance(&CancellationToken::new(), &[])
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("status: 404"), "{message}");
    assert!(message.contains("no such thing"), "{message}");
}

#[tokio::test]
async fn test_user_assigned_identity_token_query() {
    let server = StubServer::start(
        200,
        r#"{"access_token":"secret","refresh_token":"","expires_in":"3599","expires_on":"1506484173","not_before":"1506480273","resource":"https://management.azure.com/","token_type":"Bearer"}"#,
    )
    .await;
    let client = client_for(&server);
    let client_id = Uuid::new_v4();
    let object_id = Uuid::new_v4();

    let token = client
        .get_identity_token(
            &CancellationToken::new(),
            &TokenRequest::user_assigned(
                "https://management.azure.com/",
                "/subscriptions/s/resourceGroups/g/providers/Microsoft.ManagedIdentity/userAssignedIdentities/mi",
                client_id,
                object_id,
            ),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(token.token_type, "Bearer");
    assert!(!format!("{:?}", token).contains("secret"));

    let line = &server.requests()[0].request_line;
    assert!(line.contains("/metadata/identity/oauth2/token?api-version=2018-02-01"));
    assert!(line.contains("resource=https%3A%2F%2Fmanagement.azure.com%2F"));
    assert!(line.contains(&format!("client_id={}", client_id)));
    assert!(line.contains(&format!("object_id={}", object_id)));
    assert!(line.contains("mi_res_id="));
}

#[tokio::test]
async fn test_cancelled_token_short_circuits() {
    let server = StubServer::start(200, "{}").await;
    let client = client_for(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.get_instance(&cancel, &[]).await.unwrap_err();
    assert!(matches!(err, MetadataError::Cancelled));
}
