mod common;

use common::{test_client, test_config, GRAPHQL_PATH, STAGED_PATH};
use serde_json::{json, Value};
use shopify_file_upload::{StagedTarget, StagedUploadParameter, UploadError};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target(server: &MockServer, params: &[(&str, &str)]) -> StagedTarget {
    StagedTarget {
        url: format!("{}{}", server.uri(), STAGED_PATH),
        resource_url: "https://shopify-staged-uploads.storage.googleapis.com/tmp/1/doc.pdf"
            .to_string(),
        parameters: params
            .iter()
            .map(|(name, value)| StagedUploadParameter {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
    }
}

fn field_position(body: &str, name: &str) -> usize {
    body.find(&format!("name=\"{}\"", name))
        .unwrap_or_else(|| panic!("field {} missing from body", name))
}

#[tokio::test]
async fn test_transmit_sends_parameters_in_order_then_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STAGED_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, &test_config());
    let target = target(
        &server,
        &[
            ("policy", "p0l1cy"),
            ("key", "tmp/1/doc.pdf"),
            ("x-goog-signature", "s1g"),
            ("acl", "private"),
        ],
    );

    client
        .transmit(&target, b"%PDF-1.7 test".to_vec(), "doc.pdf", "application/pdf")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    let body = String::from_utf8_lossy(&request.body);

    let positions: Vec<usize> = ["policy", "key", "x-goog-signature", "acl", "file"]
        .iter()
        .map(|name| field_position(&body, name))
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "fields out of order: {:?}",
        positions
    );
    assert!(body.contains("filename=\"doc.pdf\""));
    assert!(body.contains("Content-Type: application/pdf"));
    assert!(body.contains("%PDF-1.7 test"));

    // The staged target must never see the Admin API token.
    assert!(request.headers.get("X-Shopify-Access-Token").is_none());
}

#[tokio::test]
async fn test_transmit_failure_carries_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STAGED_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<Error><Code>AccessDenied</Code><Message>Invalid signature</Message></Error>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, &test_config());
    let target = target(&server, &[("key", "tmp/1/doc.pdf")]);

    let err = client
        .transmit(&target, b"data".to_vec(), "doc.pdf", "application/pdf")
        .await
        .unwrap_err();

    match err {
        UploadError::Transmission { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("Invalid signature"));
        }
        other => panic!("expected transmission error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transmit_is_not_bound_by_graphql_deadline() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STAGED_PATH))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(800)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": {} }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.request_timeout = Duration::from_millis(200);
    let client = test_client(&server, &config);

    let err = client
        .graphql::<_, Value>("query { shop { name } }", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Request(ref e) if e.is_timeout()));

    let target = target(&server, &[("key", "tmp/1/clip.mp4")]);
    client
        .transmit(&target, vec![0u8; 4096], "clip.mp4", "video/mp4")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transmit_honours_transfer_deadline() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STAGED_PATH))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(800)))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.transfer_timeout = Duration::from_millis(200);
    let client = test_client(&server, &config);
    let target = target(&server, &[("key", "tmp/1/clip.mp4")]);

    let err = client
        .transmit(&target, vec![0u8; 16], "clip.mp4", "video/mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Request(ref e) if e.is_timeout()));
}
