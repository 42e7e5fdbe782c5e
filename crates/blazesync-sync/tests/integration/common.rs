//! Shared test helpers for transfer and pass tests
//!
//! Objects are served by a wiremock server under `/files/<key>`; a fake
//! inventory lists them and hands out URLs on that server.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use blazesync_core::domain::{RemoteInventory, RemoteObject, SyncKey};
use blazesync_core::ports::{
    AuthCredentials, IAuthProvider, IDownloadUrlResolver, ILastSyncStore, IRemoteInventory,
    ITransferObserver,
};
use blazesync_sync::engine::{RetryPolicy, SyncOrchestrator};
use blazesync_sync::state::JsonStateStore;
use blazesync_sync::transfer::TransferEngine;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REMOTE_TIME: &str = "2023-12-08T07:01:00.495Z";

pub fn object(key: &str, size: u64) -> RemoteObject {
    RemoteObject::new(SyncKey::from_remote(key).unwrap(), Some(size), REMOTE_TIME)
}

/// Serves `body` at `/files/<key>`
pub async fn mount_file(server: &MockServer, key: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{key}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Serves `status` with an empty body at `/files/<key>`
pub async fn mount_status(server: &MockServer, key: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{key}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serves `body` at `/files/<key>` after `delay`
pub async fn mount_slow_file(server: &MockServer, key: &str, body: &[u8], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{key}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.to_vec())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Maps keys to `<server>/files/<key>`
pub struct ServerResolver {
    pub base: String,
}

impl ServerResolver {
    pub fn new(server: &MockServer) -> Self {
        Self { base: server.uri() }
    }
}

#[async_trait]
impl IDownloadUrlResolver for ServerResolver {
    async fn resolve(&self, key: &SyncKey) -> Result<Url> {
        Ok(Url::parse(&format!("{}/files/{}", self.base, key))?)
    }
}

/// Fixed listing; download URLs point at the mock server
pub struct FakeInventory {
    pub objects: Vec<RemoteObject>,
    pub resolver: ServerResolver,
}

#[async_trait]
impl IRemoteInventory for FakeInventory {
    async fn list_objects(&self, _credentials: &AuthCredentials) -> Result<RemoteInventory> {
        Ok(RemoteInventory::new(self.objects.clone()))
    }

    async fn resolve_download_url(
        &self,
        _credentials: &AuthCredentials,
        key: &SyncKey,
    ) -> Result<Url> {
        self.resolver.resolve(key).await
    }
}

pub struct SignedIn;

#[async_trait]
impl IAuthProvider for SignedIn {
    async fn get_auth(&self) -> Result<Option<AuthCredentials>> {
        Ok(Some(AuthCredentials::new("test-token", "user-001")))
    }
}

/// Records observer events as strings
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ITransferObserver for RecordingObserver {
    fn started(&self, key: &SyncKey, total: Option<u64>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("started {key} {total:?}"));
    }

    fn advanced(&self, key: &SyncKey, bytes: u64) {
        self.events
            .lock()
            .unwrap()
            .push(format!("advanced {key} {bytes}"));
    }

    fn finished(&self, key: &SyncKey) {
        self.events.lock().unwrap().push(format!("finished {key}"));
    }

    fn failed(&self, key: &SyncKey, _reason: &str) {
        self.events.lock().unwrap().push(format!("failed {key}"));
    }
}

pub fn engine(deadline: Duration) -> TransferEngine {
    TransferEngine::with_client(reqwest::Client::new(), deadline)
}

/// An orchestrator over `objects`, with the marker stored in `state_dir`
pub fn orchestrator(
    server: &MockServer,
    objects: Vec<RemoteObject>,
    state_dir: &Path,
) -> (SyncOrchestrator, Arc<JsonStateStore>) {
    let store = Arc::new(JsonStateStore::in_dir(state_dir));
    let inventory = Arc::new(FakeInventory {
        objects,
        resolver: ServerResolver::new(server),
    });
    let orchestrator = SyncOrchestrator::new(
        Arc::new(SignedIn),
        inventory,
        store.clone() as Arc<dyn ILastSyncStore + Send + Sync>,
        Arc::new(engine(Duration::from_secs(10))),
        4,
    )
    .with_retry_policy(RetryPolicy {
        max_retries: 0,
        base_delay: Duration::from_millis(1),
    });
    (orchestrator, store)
}
