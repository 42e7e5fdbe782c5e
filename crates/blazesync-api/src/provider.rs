//! BlazedCloud implementation of [`IRemoteInventory`]
//!
//! Decodes the `listall` records strictly, one at a time. A record that
//! fails to decode is rejected on its own; the rest of the listing survives.

use std::sync::Arc;

use anyhow::Context;
use blazesync_core::domain::key::REMOTE_SEPARATORS;
use blazesync_core::domain::{RejectedRecord, RemoteInventory, RemoteObject, SyncKey};
use blazesync_core::ports::{AuthCredentials, IRemoteInventory, RemoteError};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::client::BackendClient;

/// One record of the `data/listall` response
///
/// Only `Key` and `LastModified` are required; everything else the backend
/// sends (`Owner`, `ChecksumAlgorithm`, ...) is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
    #[serde(default)]
    size: Option<u64>,
    last_modified: String,
    #[serde(rename = "ETag", default)]
    etag: Option<String>,
    #[serde(default)]
    storage_class: Option<String>,
}

/// Outcome of decoding a single listing record
#[derive(Debug)]
enum Decoded {
    Object(RemoteObject),
    /// A key ending with a separator: a folder marker, not a file
    DirectoryMarker(String),
    Rejected(RejectedRecord),
}

fn decode_record(index: usize, value: serde_json::Value) -> Decoded {
    let raw_key = value
        .get("Key")
        .and_then(|k| k.as_str())
        .map(str::to_string);

    let listed: ListedObject = match serde_json::from_value(value) {
        Ok(listed) => listed,
        Err(e) => {
            return Decoded::Rejected(RejectedRecord {
                index,
                key: raw_key,
                reason: e.to_string(),
            })
        }
    };

    if listed.key.ends_with(REMOTE_SEPARATORS) {
        return Decoded::DirectoryMarker(listed.key);
    }

    match SyncKey::from_container_key(&listed.key) {
        Ok(key) => {
            let mut object = RemoteObject::new(key, listed.size, listed.last_modified);
            object.etag = listed.etag;
            object.storage_class = listed.storage_class;
            Decoded::Object(object)
        }
        Err(e) => Decoded::Rejected(RejectedRecord {
            index,
            key: Some(listed.key),
            reason: e.to_string(),
        }),
    }
}

/// Builds a [`RemoteInventory`] from raw listing records
pub fn decode_listing(records: Vec<serde_json::Value>) -> RemoteInventory {
    let mut inventory = RemoteInventory::default();
    for (index, record) in records.into_iter().enumerate() {
        match decode_record(index, record) {
            Decoded::Object(object) => inventory.objects.push(object),
            Decoded::DirectoryMarker(key) => debug!(%key, "Skipping directory marker"),
            Decoded::Rejected(rejected) => {
                warn!(
                    index = rejected.index,
                    key = ?rejected.key,
                    reason = %rejected.reason,
                    "Rejected listing record"
                );
                inventory.rejected.push(rejected);
            }
        }
    }
    inventory
}

/// [`IRemoteInventory`] backed by the BlazedCloud data endpoints
#[derive(Debug, Clone)]
pub struct BackendInventoryProvider {
    client: Arc<BackendClient>,
}

impl BackendInventoryProvider {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl IRemoteInventory for BackendInventoryProvider {
    #[tracing::instrument(skip(self, credentials), fields(account_id = %credentials.account_id))]
    async fn list_objects(&self, credentials: &AuthCredentials) -> anyhow::Result<RemoteInventory> {
        let records = self
            .client
            .list_all(credentials)
            .await
            .map_err(RemoteError::from)
            .context("Failed to list remote objects")?;
        let inventory = decode_listing(records);
        debug!(
            objects = inventory.objects.len(),
            rejected = inventory.rejected.len(),
            "Remote inventory decoded"
        );
        Ok(inventory)
    }

    async fn resolve_download_url(
        &self,
        credentials: &AuthCredentials,
        key: &SyncKey,
    ) -> anyhow::Result<Url> {
        self.client
            .download_url(credentials, key.as_str())
            .await
            .map_err(RemoteError::from)
            .with_context(|| format!("Failed to obtain download URL for {key}"))
    }
}
