#![allow(dead_code)]

use serde_json::{json, Value};
use shopify_file_upload::{Config, ShopifyClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GRAPHQL_PATH: &str = "/admin/api/2024-10/graphql.json";
pub const STAGED_PATH: &str = "/staged";
pub const ACCESS_TOKEN: &str = "shpat_test_token";

pub fn test_config() -> Config {
    let mut config = Config::new("test-shop.myshopify.com", ACCESS_TOKEN);
    config.poll_interval = Duration::ZERO;
    config.poll_attempts = 5;
    config
}

pub fn test_client(server: &MockServer, config: &Config) -> ShopifyClient {
    ShopifyClient::new_with_url(config, &format!("{}{}", server.uri(), GRAPHQL_PATH)).unwrap()
}

/// A `stagedUploadsCreate` response pointing at the mock server's staged path.
pub fn staged_target_body(server: &MockServer, resource_url: &str) -> Value {
    json!({
        "data": {
            "stagedUploadsCreate": {
                "stagedTargets": [{
                    "url": format!("{}{}", server.uri(), STAGED_PATH),
                    "resourceUrl": resource_url,
                    "parameters": [
                        { "name": "Content-Type", "value": "image/jpeg" },
                        { "name": "success_action_status", "value": "201" },
                        { "name": "acl", "value": "private" },
                        { "name": "key", "value": "tmp/1/photo.jpg" },
                        { "name": "x-goog-date", "value": "20240101T000000Z" },
                        { "name": "x-goog-credential", "value": "cred/20240101/auto/storage/goog4_request" },
                        { "name": "x-goog-algorithm", "value": "GOOG4-RSA-SHA256" },
                        { "name": "x-goog-signature", "value": "abc123" },
                        { "name": "policy", "value": "eyJjb25kaXRpb25zIjpbXX0=" }
                    ]
                }],
                "userErrors": []
            }
        }
    })
}

pub fn file_create_body(id: &str) -> Value {
    json!({
        "data": {
            "fileCreate": {
                "files": [{ "id": id, "fileStatus": "UPLOADED" }],
                "userErrors": []
            }
        }
    })
}

pub fn image_node(id: &str, status: &str, url: Option<&str>) -> Value {
    json!({
        "data": {
            "node": {
                "__typename": "MediaImage",
                "id": id,
                "fileStatus": status,
                "image": url.map(|u| json!({ "url": u }))
            }
        }
    })
}

pub async fn mount_staging(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("stagedUploadsCreate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_file_create(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("fileCreate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a `node(id:)` responder that walks through `responses`, repeating the last one.
pub async fn mount_node_sequence(server: &MockServer, responses: Vec<Value>, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("node(id: $id)"))
        .respond_with(Sequence::new(responses))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub struct Sequence {
    responses: Vec<Value>,
    calls: AtomicUsize,
}

impl Sequence {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }
}

impl wiremock::Respond for Sequence {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.responses.len() - 1);
        ResponseTemplate::new(200).set_body_json(self.responses[index].clone())
    }
}
