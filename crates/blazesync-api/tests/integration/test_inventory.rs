//! Listing, health and usage endpoints

use blazesync_api::provider::BackendInventoryProvider;
use blazesync_api::ApiError;
use blazesync_core::ports::IRemoteInventory;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{credentials, listing_record, mount_listing, setup_backend, ACCOUNT};

#[tokio::test]
async fn test_listing_strips_container_and_keeps_order() {
    let (server, client) = setup_backend().await;
    mount_listing(
        &server,
        serde_json::json!([
            listing_record(&format!("{ACCOUNT}/docs/report.pdf"), 2048),
            listing_record(&format!("{ACCOUNT}/photos/"), 0),
            listing_record(&format!("{ACCOUNT}/photos/cat.jpg"), 512),
        ]),
    )
    .await;

    let provider = BackendInventoryProvider::new(client);
    let inventory = provider.list_objects(&credentials()).await.unwrap();

    let keys: Vec<&str> = inventory.objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["docs/report.pdf", "photos/cat.jpg"]);
    assert_eq!(inventory.objects[0].size, Some(2048));
    assert!(inventory.rejected.is_empty());
}

#[tokio::test]
async fn test_listing_rejects_bad_records_individually() {
    let (server, client) = setup_backend().await;
    mount_listing(
        &server,
        serde_json::json!([
            listing_record(&format!("{ACCOUNT}/a.txt"), 1),
            { "Key": format!("{ACCOUNT}/b.txt"), "Size": 3 },
            listing_record(&format!("{ACCOUNT}/c.txt"), 1),
        ]),
    )
    .await;

    let provider = BackendInventoryProvider::new(client);
    let inventory = provider.list_objects(&credentials()).await.unwrap();

    assert_eq!(inventory.objects.len(), 2);
    assert_eq!(inventory.rejected.len(), 1);
    assert_eq!(inventory.rejected[0].index, 1);
}

#[tokio::test]
async fn test_listing_error_status_fails_the_fetch() {
    let (server, client) = setup_backend().await;
    Mock::given(method("GET"))
        .and(path(format!("/data/listall/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = BackendInventoryProvider::new(client);
    let err = provider.list_objects(&credentials()).await.unwrap_err();
    let api = err.downcast_ref::<ApiError>().unwrap();
    assert!(matches!(api, ApiError::ServerError { status: 500, .. }));
}

#[tokio::test]
async fn test_listing_that_is_not_an_array_is_invalid() {
    let (server, client) = setup_backend().await;
    mount_listing(&server, serde_json::json!({"message": "nope"})).await;

    let err = client.list_all(&credentials()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unauthorized_listing() {
    let (server, client) = setup_backend().await;
    Mock::given(method("GET"))
        .and(path(format!("/data/listall/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let err = client.list_all(&credentials()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_health_returns_message() {
    let (server, client) = setup_backend().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 200,
            "message": "API is healthy.",
            "data": {}
        })))
        .mount(&server)
        .await;

    assert_eq!(client.health().await.unwrap(), "API is healthy.");
}

#[tokio::test]
async fn test_usage_returns_trimmed_text() {
    let (server, client) = setup_backend().await;
    Mock::given(method("GET"))
        .and(path(format!("/data/usage/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("1048576\n"))
        .mount(&server)
        .await;

    assert_eq!(client.usage(&credentials()).await.unwrap(), "1048576");
}
