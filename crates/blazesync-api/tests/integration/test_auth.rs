//! Login, refresh and session clearing

use std::sync::Arc;

use blazesync_api::auth::{BackendAuthProvider, ISessionStore, MemorySessionStore, StoredSession};
use blazesync_core::ports::IAuthProvider;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{mount_auth, setup_backend, ACCOUNT};

fn saved(token: &str) -> StoredSession {
    StoredSession {
        token: token.into(),
        account_id: ACCOUNT.into(),
        email: Some("test@example.com".into()),
    }
}

#[tokio::test]
async fn test_login_stores_session() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-password"))
        .and(body_string_contains("identity=test%40example.com"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "fresh",
            "record": { "id": ACCOUNT, "email": "test@example.com" }
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let provider = BackendAuthProvider::new(client, store.clone());

    let session = provider.login("test@example.com", "hunter2").await.unwrap();
    assert_eq!(session.token, "fresh");
    assert_eq!(store.load().unwrap(), Some(session));
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 400,
            "message": "Failed to authenticate."
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let provider = BackendAuthProvider::new(client, store.clone());

    let err = provider.login("test@example.com", "wrong").await.unwrap_err();
    assert!(err.to_string().contains("Invalid email or password"));
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_get_auth_without_session_is_none() {
    let (_server, client) = setup_backend().await;
    let provider = BackendAuthProvider::new(client, Arc::new(MemorySessionStore::new()));
    assert!(provider.get_auth().await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_auth_refreshes_and_saves_token() {
    let (server, client) = setup_backend().await;
    mount_auth(&server, "auth-refresh", "rotated").await;

    let store = Arc::new(MemorySessionStore::with_session(saved("old")));
    let provider = BackendAuthProvider::new(client, store.clone());

    let creds = provider.get_auth().await.unwrap().unwrap();
    assert_eq!(creds.token, "rotated");
    assert_eq!(creds.account_id, ACCOUNT);
    assert_eq!(store.load().unwrap().unwrap().token, "rotated");
}

#[tokio::test]
async fn test_refused_session_is_cleared() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-refresh"))
        .and(header("authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(saved("revoked")));
    let provider = BackendAuthProvider::new(client, store.clone());

    assert!(provider.get_auth().await.unwrap().is_none());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_keeps_session() {
    let (server, client) = setup_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-refresh"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(saved("still-good")));
    let provider = BackendAuthProvider::new(client, store.clone());

    assert!(provider.get_auth().await.is_err());
    assert_eq!(store.load().unwrap(), Some(saved("still-good")));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (_server, client) = setup_backend().await;
    let store = Arc::new(MemorySessionStore::with_session(saved("t")));
    let provider = BackendAuthProvider::new(client, store.clone());

    provider.logout().unwrap();
    assert!(provider.current_session().unwrap().is_none());
}
