//! Download engine
//!
//! Streams one remote object into `<final>.blazesync-part`, then publishes
//! it with a rename and stamps it with the remote modification time.
//!
//! ```text
//!  resolve URL ──► mkdir (serialized) ──► GET ──► chunks ──► temp file
//!                                                               │
//!                          set mtime/atime ◄── rename ◄── fsync ┘
//! ```
//!
//! The final path is never opened for writing, so an interrupted pass
//! leaves at most a temp file, which the next walk deletes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use blazesync_core::config::{BackendConfig, TransferConfig};
use blazesync_core::domain::{RemoteObject, SyncKey};
use blazesync_core::ports::{IDownloadUrlResolver, ITransferObserver, NoopTransferObserver};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use filetime::FileTime;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{TransferError, TEMP_FILE_SUFFIX};

/// Outcome of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub key: SyncKey,
    /// Where the object was published
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// Downloads remote objects into the sync root
pub struct TransferEngine {
    client: reqwest::Client,
    /// Upper bound for one object, from URL resolution to rename
    deadline: Duration,
    /// Keys currently being downloaded
    in_flight: DashMap<SyncKey, ()>,
    /// Serializes directory creation across concurrent transfers
    dir_lock: tokio::sync::Mutex<()>,
    observer: Arc<dyn ITransferObserver + Send + Sync>,
}

impl TransferEngine {
    /// Builds an engine with its own HTTP client.
    ///
    /// Downloads get no per-request timeout; the transfer deadline bounds
    /// them instead.
    pub fn new(transfer: &TransferConfig, backend: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(backend.connect_timeout_secs))
            .user_agent(concat!("blazesync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(
            client,
            Duration::from_secs(transfer.transfer_deadline_secs),
        ))
    }

    pub fn with_client(client: reqwest::Client, deadline: Duration) -> Self {
        Self {
            client,
            deadline,
            in_flight: DashMap::new(),
            dir_lock: tokio::sync::Mutex::new(()),
            observer: Arc::new(NoopTransferObserver),
        }
    }

    /// Replace the progress observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ITransferObserver + Send + Sync>) -> Self {
        self.observer = observer;
        self
    }

    /// Whether `key` is currently being downloaded
    pub fn is_in_flight(&self, key: &SyncKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Download `object` into `destination_root`.
    ///
    /// # Errors
    /// Every failure is a [`TransferError`] scoped to this object. Except
    /// for [`TransferError::Filesystem`] raised while stamping times, no
    /// failure leaves anything at the final path.
    #[instrument(skip(self, object, resolver, cancel), fields(key = %object.key))]
    pub async fn download(
        &self,
        object: &RemoteObject,
        destination_root: &Path,
        resolver: &dyn IDownloadUrlResolver,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        let modified_at = object
            .modified_at()
            .map_err(|_| TransferError::MalformedTimestamp {
                value: object.last_modified.clone(),
            })?;

        let _slot = self.claim(&object.key)?;

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let result = self
            .transfer(object, modified_at, destination_root, resolver, cancel)
            .await;
        match &result {
            Ok(report) => {
                debug!(bytes = report.bytes, path = %report.path.display(), "download published");
                self.observer.finished(&object.key);
            }
            Err(err) => {
                warn!(error = %err, "download failed");
                self.observer.failed(&object.key, &err.to_string());
            }
        }
        result
    }

    async fn transfer(
        &self,
        object: &RemoteObject,
        modified_at: DateTime<Utc>,
        destination_root: &Path,
        resolver: &dyn IDownloadUrlResolver,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        let url = resolver
            .resolve(&object.key)
            .await
            .map_err(|err| TransferError::UrlResolution(format!("{err:#}")))?;

        let final_path = destination_root.join(object.key.to_relative_path());
        let temp_path = temp_path_for(&final_path);
        self.ensure_parent(&final_path).await?;

        let streamed = tokio::time::timeout(
            self.deadline,
            self.stream_to(&object.key, url, &temp_path, cancel),
        )
        .await;
        let bytes = match streamed {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                discard(&temp_path).await;
                return Err(err);
            }
            Err(_) => {
                discard(&temp_path).await;
                return Err(TransferError::TimedOut {
                    secs: self.deadline.as_secs(),
                });
            }
        };

        if let Err(err) = tokio::fs::rename(&temp_path, &final_path).await {
            discard(&temp_path).await;
            return Err(TransferError::PublishFailed {
                path: final_path,
                message: err.to_string(),
            });
        }

        let stamp = FileTime::from_system_time(modified_at.into());
        filetime::set_file_times(&final_path, stamp, stamp)
            .map_err(|err| TransferError::filesystem(&final_path, err))?;

        Ok(TransferReport {
            key: object.key.clone(),
            path: final_path,
            bytes,
        })
    }

    /// GET `url` and write the body to `temp_path`, returning the byte count
    async fn stream_to(
        &self,
        key: &SyncKey,
        url: Url,
        temp_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| TransferError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::RemoteRejected {
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        self.observer.started(key, total);

        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|err| TransferError::filesystem(temp_path, err))?;
        let mut received = 0u64;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                chunk = response.chunk() => {
                    chunk.map_err(|err| TransferError::Network(err.to_string()))?
                }
            };
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk)
                .await
                .map_err(|err| TransferError::filesystem(temp_path, err))?;
            received += chunk.len() as u64;
            self.observer.advanced(key, chunk.len() as u64);
        }

        if let Some(expected) = total {
            if received != expected {
                return Err(TransferError::Network(format!(
                    "body ended after {received} of {expected} bytes"
                )));
            }
        }

        file.flush()
            .await
            .map_err(|err| TransferError::filesystem(temp_path, err))?;
        file.sync_all()
            .await
            .map_err(|err| TransferError::PublishFailed {
                path: temp_path.to_path_buf(),
                message: format!("fsync failed: {err}"),
            })?;

        Ok(received)
    }

    async fn ensure_parent(&self, final_path: &Path) -> Result<(), TransferError> {
        let Some(parent) = final_path.parent() else {
            return Ok(());
        };
        let _lock = self.dir_lock.lock().await;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| TransferError::filesystem(parent, err))
    }

    fn claim(&self, key: &SyncKey) -> Result<InFlightSlot<'_>, TransferError> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => Err(TransferError::AlreadyInFlight),
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(InFlightSlot {
                    in_flight: &self.in_flight,
                    key: key.clone(),
                })
            }
        }
    }
}

/// Releases a key from the in-flight set when dropped
struct InFlightSlot<'a> {
    in_flight: &'a DashMap<SyncKey, ()>,
    key: SyncKey,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// `<final>.blazesync-part`, next to the final path so the rename stays on
/// one filesystem
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut p = final_path.as_os_str().to_owned();
    p.push(TEMP_FILE_SUFFIX);
    PathBuf::from(p)
}

async fn discard(temp_path: &Path) {
    match tokio::fs::remove_file(temp_path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(path = %temp_path.display(), error = %err, "failed to remove temp file");
        }
    }
}
