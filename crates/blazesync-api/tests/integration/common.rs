//! Shared helpers: a mock backend and a client pointed at it

use std::sync::Arc;

use blazesync_api::client::BackendClient;
use blazesync_core::ports::AuthCredentials;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const ACCOUNT: &str = "user-test-001";

pub fn credentials() -> AuthCredentials {
    AuthCredentials::new(TOKEN, ACCOUNT)
}

/// Starts a mock server and a client whose base URL points at it
pub async fn setup_backend() -> (MockServer, Arc<BackendClient>) {
    let server = MockServer::start().await;
    let client = Arc::new(BackendClient::with_base_url(server.uri()));
    (server, client)
}

/// A listing record as the backend sends it
pub fn listing_record(key: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "ETag": "\"d41d8cd98f00b204e9800998ecf8427e\"",
        "Key": key,
        "LastModified": "2023-12-08T07:01:00.495Z",
        "Size": size,
        "StorageClass": "STANDARD",
        "ChecksumAlgorithm": [],
        "Owner": null,
        "RestoreStatus": null
    })
}

/// Mounts `GET data/listall/{ACCOUNT}` answering with `records`
pub async fn mount_listing(server: &MockServer, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/data/listall/{ACCOUNT}")))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

/// Mounts an auth endpoint answering with a token for `ACCOUNT`
pub async fn mount_auth(server: &MockServer, endpoint: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/api/collections/users/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": token,
            "record": {
                "id": ACCOUNT,
                "email": "test@example.com",
                "verified": true
            }
        })))
        .mount(server)
        .await;
}
