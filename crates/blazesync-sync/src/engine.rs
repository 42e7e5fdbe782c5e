//! Sync pass orchestrator
//!
//! The [`SyncOrchestrator`] runs one-way passes from the cloud into the
//! local sync root.
//!
//! ## Pass Flow
//!
//! 1. **Guard**: skip without a sync root or while another pass runs
//! 2. **Inventories**: credentials, remote listing, local walk
//! 3. **Reconcile**: classify keys, then ask for confirmation
//! 4. **Transfer**: download missing objects with bounded concurrency
//! 5. **Bookkeeping**: record the last-sync marker, return a [`PassSummary`]
//!
//! Failures in steps 2-3 abort the pass and mark it failed. Failures of a
//! single download are recorded and the pass carries on.
//!
//! ## Retry Logic
//!
//! The listing and URL requests are retried on transient errors (network,
//! rate limiting, server errors) with exponential backoff: 1s, 2s, 4s, 8s,
//! 16s by default.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use blazesync_core::domain::{
    reconcile, LocalInventory, PassId, ReconcileIssue, Reconciliation, RejectedRecord,
    RemoteInventory, SyncKey, SyncSettings, SyncStatus,
};
use blazesync_core::ports::{
    AuthCredentials, IAuthProvider, IDownloadUrlResolver, ILastSyncStore, IPassConfirmation,
    IRemoteInventory, RemoteError, TransferPreview,
};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::filesystem::LocalFileSystemAdapter;
use crate::transfer::{TransferEngine, TransferReport};
use crate::{SyncError, TransferError};

// ============================================================================
// Requests and outcomes
// ============================================================================

/// What a pass should synchronize
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// `None` until the user has selected a folder
    pub sync_root: Option<PathBuf>,
    pub settings: SyncSettings,
}

/// Why a pass did not start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoSyncRoot,
    AlreadyRunning,
}

/// Result of [`SyncOrchestrator::run_sync`]
#[derive(Debug, Clone)]
pub enum PassOutcome {
    Skipped(SkipReason),
    Completed(PassSummary),
}

/// A download that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub key: SyncKey,
    pub error: String,
}

/// Summary of a completed pass
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub pass_id: PassId,
    pub sync_root: PathBuf,
    /// Counts and byte totals shown at the confirmation gate
    pub preview: TransferPreview,
    pub issues: Vec<ReconcileIssue>,
    pub rejected: Vec<RejectedRecord>,
    /// Local entries the walker skipped
    pub local_issues: Vec<String>,
    pub removed_temp_files: usize,
    /// Whether the user approved the transfers
    pub confirmed: bool,
    pub downloaded: usize,
    pub bytes_downloaded: u64,
    pub failures: Vec<TransferFailure>,
    /// Informational messages (inert settings, marker problems)
    pub notes: Vec<String>,
    pub duration_ms: u64,
}

/// Result of [`SyncOrchestrator::preview`]
#[derive(Debug, Clone, Serialize)]
pub struct PassPreview {
    pub sync_root: PathBuf,
    pub preview: TransferPreview,
    pub reconciliation: Reconciliation,
    pub rejected: Vec<RejectedRecord>,
    pub local_issues: Vec<String>,
}

// ============================================================================
// Retry logic
// ============================================================================

/// Backoff schedule for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Determines whether an error is worth retrying
///
/// Only failures the remote adapter classified as transient (network,
/// rate limiting, server errors) qualify. Anything else, including errors
/// with no [`RemoteError`] in their chain, is permanent.
fn is_transient_error(err: &anyhow::Error) -> bool {
    RemoteError::find(err).is_some_and(RemoteError::is_transient)
}

/// Executes an async operation, retrying transient failures with
/// exponential backoff
async fn with_retry<F, Fut, T>(policy: RetryPolicy, operation_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && is_transient_error(&err) => {
                let delay = policy.base_delay * 2u32.pow(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// Pass guard
// ============================================================================

/// Holds the single-pass slot; writes the final status when dropped
struct PassGuard<'a> {
    slot: &'a Mutex<SyncStatus>,
    outcome: Option<SyncStatus>,
}

impl PassGuard<'_> {
    fn finish(mut self, status: SyncStatus) {
        self.outcome = Some(status);
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let status = self
            .outcome
            .take()
            .unwrap_or_else(|| SyncStatus::Failed("pass interrupted".to_string()));
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

/// Resolves download URLs with the credentials of the current pass
struct BoundResolver<'a> {
    inventory: &'a (dyn IRemoteInventory + Send + Sync),
    credentials: &'a AuthCredentials,
    retry: RetryPolicy,
}

#[async_trait::async_trait]
impl<'a> IDownloadUrlResolver for BoundResolver<'a> {
    async fn resolve(&self, key: &SyncKey) -> Result<Url> {
        with_retry(self.retry, "resolve_download_url", || {
            self.inventory.resolve_download_url(self.credentials, key)
        })
        .await
    }
}

/// Everything gathered before the confirmation gate
struct Snapshot {
    credentials: AuthCredentials,
    remote: RemoteInventory,
    local: LocalInventory,
    reconciliation: Reconciliation,
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

/// Runs sync passes, one at a time
///
/// ## Dependencies
///
/// - `auth_provider`: bearer token and account id
/// - `remote_inventory`: listing and download URLs
/// - `state_store`: the last-sync marker
/// - `transfer`: the download engine
pub struct SyncOrchestrator {
    auth_provider: Arc<dyn IAuthProvider + Send + Sync>,
    remote_inventory: Arc<dyn IRemoteInventory + Send + Sync>,
    state_store: Arc<dyn ILastSyncStore + Send + Sync>,
    transfer: Arc<TransferEngine>,
    local_filesystem: LocalFileSystemAdapter,
    /// Current status; also the single-pass guard
    status: Mutex<SyncStatus>,
    max_concurrent_downloads: usize,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl SyncOrchestrator {
    /// Creates an orchestrator that downloads up to
    /// `max_concurrent_downloads` objects at once (at least one)
    pub fn new(
        auth_provider: Arc<dyn IAuthProvider + Send + Sync>,
        remote_inventory: Arc<dyn IRemoteInventory + Send + Sync>,
        state_store: Arc<dyn ILastSyncStore + Send + Sync>,
        transfer: Arc<TransferEngine>,
        max_concurrent_downloads: usize,
    ) -> Self {
        Self {
            auth_provider,
            remote_inventory,
            state_store,
            transfer,
            local_filesystem: LocalFileSystemAdapter::new(),
            status: Mutex::new(SyncStatus::Idle),
            max_concurrent_downloads: max_concurrent_downloads.max(1),
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use `cancel` to stop transfers (e.g. on Ctrl-C)
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current status, as shown to the user
    pub fn status(&self) -> SyncStatus {
        self.lock_status().clone()
    }

    fn lock_status(&self) -> MutexGuard<'_, SyncStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claims the pass slot, returning the previous status
    fn try_begin(&self) -> Option<(PassGuard<'_>, SyncStatus)> {
        let mut status = self.lock_status();
        if status.is_running() {
            return None;
        }
        let previous = std::mem::replace(&mut *status, SyncStatus::Syncing);
        Some((
            PassGuard {
                slot: &self.status,
                outcome: None,
            },
            previous,
        ))
    }

    // ========================================================================
    // run_sync()
    // ========================================================================

    /// Runs one pass.
    ///
    /// # Returns
    /// [`PassOutcome::Skipped`] when there is no sync root or a pass is
    /// already running, otherwise the [`PassSummary`].
    ///
    /// # Errors
    /// Pass-level failures: credentials, remote listing, local walk, or
    /// cancellation. The status becomes "Sync failed" and the marker is not
    /// written.
    pub async fn run_sync(
        &self,
        request: SyncRequest,
        confirm: &dyn IPassConfirmation,
    ) -> Result<PassOutcome, SyncError> {
        let Some(sync_root) = request.sync_root else {
            let mut status = self.lock_status();
            if !status.is_running() {
                *status = SyncStatus::FolderNotSelected;
            }
            info!("No sync folder selected, skipping pass");
            return Ok(PassOutcome::Skipped(SkipReason::NoSyncRoot));
        };

        let Some((guard, _previous)) = self.try_begin() else {
            info!("A sync pass is already running, skipping");
            return Ok(PassOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        let pass_id = PassId::new();
        match self
            .execute_pass(pass_id, &sync_root, &request.settings, confirm)
            .await
        {
            Ok(summary) => {
                guard.finish(SyncStatus::Synced);
                Ok(PassOutcome::Completed(summary))
            }
            Err(err) => {
                error!(%pass_id, error = %err, "Sync pass failed");
                guard.finish(SyncStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self, sync_root, settings, confirm), fields(%pass_id, root = %sync_root.display()))]
    async fn execute_pass(
        &self,
        pass_id: PassId,
        sync_root: &Path,
        settings: &SyncSettings,
        confirm: &dyn IPassConfirmation,
    ) -> Result<PassSummary, SyncError> {
        let start = Instant::now();
        info!("Starting sync pass");

        let snapshot = self.gather(sync_root).await?;
        let preview = TransferPreview::new(
            &snapshot.reconciliation,
            snapshot.remote.rejected.len(),
            settings.download_missing_files,
        );

        let mut summary = PassSummary {
            pass_id,
            sync_root: sync_root.to_path_buf(),
            preview: preview.clone(),
            issues: snapshot.reconciliation.issues.clone(),
            rejected: snapshot.remote.rejected.clone(),
            local_issues: snapshot
                .local
                .issues
                .iter()
                .map(ToString::to_string)
                .collect(),
            removed_temp_files: snapshot.local.removed_temp_files.len(),
            confirmed: false,
            downloaded: 0,
            bytes_downloaded: 0,
            failures: Vec::new(),
            notes: Vec::new(),
            duration_ms: 0,
        };

        if snapshot.reconciliation.has_work() {
            summary.confirmed = match confirm.confirm(&preview).await {
                Ok(answer) => answer,
                Err(err) => {
                    warn!(error = %err, "Confirmation failed, treating as declined");
                    summary
                        .notes
                        .push(format!("Confirmation failed ({err:#}); no files transferred"));
                    false
                }
            };
        } else {
            debug!("Nothing to transfer, skipping confirmation");
        }

        if summary.confirmed {
            if settings.download_missing_files {
                self.download_missing(sync_root, &snapshot, &mut summary).await;
            } else {
                summary
                    .notes
                    .push("download_missing_files is disabled; no files downloaded".into());
            }

            if settings.upload_unsynced_files && !snapshot.reconciliation.unsynced.is_empty() {
                info!(
                    count = snapshot.reconciliation.unsynced.len(),
                    "Unsynced local files found; uploading is not supported"
                );
            }
            for key in settings.inert_enabled() {
                summary
                    .notes
                    .push(format!("{key} is enabled but not supported yet; skipped"));
            }
        } else if snapshot.reconciliation.has_work() {
            info!("Transfers declined");
        }

        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        if let Err(err) = self.state_store.record_sync(Utc::now()).await {
            warn!(error = %err, "Failed to record last sync time");
            summary
                .notes
                .push(format!("Could not record last sync time: {err:#}"));
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            downloaded = summary.downloaded,
            failed = summary.failures.len(),
            duration_ms = summary.duration_ms,
            "Sync pass complete"
        );
        Ok(summary)
    }

    /// Credentials, both inventories and their reconciliation
    async fn gather(&self, sync_root: &Path) -> Result<Snapshot, SyncError> {
        let credentials = match self.auth_provider.get_auth().await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return Err(SyncError::AuthUnavailable("not signed in".to_string())),
            Err(err) => return Err(SyncError::AuthUnavailable(format!("{err:#}"))),
        };

        let remote = with_retry(self.retry, "list_objects", || {
            self.remote_inventory.list_objects(&credentials)
        })
        .await
        .map_err(|err| SyncError::InventoryFetchFailed(format!("{err:#}")))?;
        for record in &remote.rejected {
            warn!(
                index = record.index,
                key = ?record.key,
                reason = %record.reason,
                "Rejected listing record"
            );
        }

        let local = self.local_filesystem.scan(sync_root).await?;

        let reconciliation = reconcile(&remote.objects, &local.files);
        for issue in &reconciliation.issues {
            warn!(%issue, "Reconciliation issue");
        }
        info!(
            remote = remote.objects.len(),
            local = local.files.len(),
            missing = reconciliation.missing.len(),
            unsynced = reconciliation.unsynced.len(),
            up_to_date = reconciliation.up_to_date.len(),
            "Inventories reconciled"
        );

        Ok(Snapshot {
            credentials,
            remote,
            local,
            reconciliation,
        })
    }

    async fn download_missing(
        &self,
        sync_root: &Path,
        snapshot: &Snapshot,
        summary: &mut PassSummary,
    ) {
        let resolver = BoundResolver {
            inventory: self.remote_inventory.as_ref(),
            credentials: &snapshot.credentials,
            retry: self.retry,
        };
        let resolver = &resolver;
        let transfer = self.transfer.as_ref();
        let cancel = &self.cancel;

        let results: Vec<(SyncKey, Result<TransferReport, TransferError>)> =
            stream::iter(&snapshot.reconciliation.missing)
                .map(move |object| async move {
                    let result = if cancel.is_cancelled() {
                        Err(TransferError::Cancelled)
                    } else {
                        transfer.download(object, sync_root, resolver, cancel).await
                    };
                    (object.key.clone(), result)
                })
                .buffer_unordered(self.max_concurrent_downloads)
                .collect()
                .await;

        for (key, result) in results {
            match result {
                Ok(report) => {
                    summary.downloaded += 1;
                    summary.bytes_downloaded += report.bytes;
                }
                Err(err) => summary.failures.push(TransferFailure {
                    key,
                    error: err.to_string(),
                }),
            }
        }
    }

    // ========================================================================
    // preview()
    // ========================================================================

    /// Dry run: inventories and reconciliation only.
    ///
    /// Holds the pass guard while running and restores the previous status
    /// afterwards. Never transfers and never writes the marker.
    #[tracing::instrument(skip(self, sync_root, settings), fields(root = %sync_root.display()))]
    pub async fn preview(
        &self,
        sync_root: &Path,
        settings: &SyncSettings,
    ) -> Result<PassPreview, SyncError> {
        let Some((guard, previous)) = self.try_begin() else {
            return Err(SyncError::PassInProgress);
        };
        let result = self.gather(sync_root).await;
        guard.finish(previous);

        let snapshot = result?;
        Ok(PassPreview {
            sync_root: sync_root.to_path_buf(),
            preview: TransferPreview::new(
                &snapshot.reconciliation,
                snapshot.remote.rejected.len(),
                settings.download_missing_files,
            ),
            rejected: snapshot.remote.rejected,
            local_issues: snapshot
                .local
                .issues
                .iter()
                .map(ToString::to_string)
                .collect(),
            reconciliation: snapshot.reconciliation,
        })
    }
}
