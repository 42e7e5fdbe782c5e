//! Download URL issuing

use blazesync_api::provider::BackendInventoryProvider;
use blazesync_api::ApiError;
use blazesync_core::domain::SyncKey;
use blazesync_core::ports::{IRemoteInventory, RemoteError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{credentials, setup_backend, ACCOUNT, TOKEN};

#[tokio::test]
async fn test_download_url_posts_key_with_forward_slashes() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path(format!("/data/down/{ACCOUNT}")))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_string_contains("filename=docs%2Fa.txt"))
        .and(body_string_contains("useShlink=false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("https://cdn.example.com/signed?sig=abc\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = BackendInventoryProvider::new(client);
    let key = SyncKey::from_remote("docs\\a.txt").unwrap();
    let url = provider
        .resolve_download_url(&credentials(), &key)
        .await
        .unwrap();

    assert_eq!(url.as_str(), "https://cdn.example.com/signed?sig=abc");
}

#[tokio::test]
async fn test_quoted_url_is_accepted() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path(format!("/data/down/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"https://cdn.example.com/x\""))
        .mount(&server)
        .await;

    let url = client.download_url(&credentials(), "x").await.unwrap();
    assert_eq!(url.host_str(), Some("cdn.example.com"));
}

#[tokio::test]
async fn test_garbage_body_is_invalid_response() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path(format!("/data/down/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not a url"))
        .mount(&server)
        .await;

    let err = client.download_url(&credentials(), "a.txt").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_missing_object_is_rejected() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path(format!("/data/down/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such key"))
        .mount(&server)
        .await;

    let err = client.download_url(&credentials(), "gone.txt").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn test_missing_object_is_permanent_whatever_its_name() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path(format!("/data/down/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let provider = BackendInventoryProvider::new(client);
    let key = SyncKey::from_remote("photos/IMG_5001.jpg").unwrap();
    let err = provider
        .resolve_download_url(&credentials(), &key)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("IMG_5001"));
    assert!(!RemoteError::find(&err).unwrap().is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path(format!("/data/down/{ACCOUNT}")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let provider = BackendInventoryProvider::new(client);
    let key = SyncKey::from_remote("a.txt").unwrap();
    let err = provider
        .resolve_download_url(&credentials(), &key)
        .await
        .unwrap_err();

    assert!(RemoteError::find(&err).unwrap().is_transient());
}
