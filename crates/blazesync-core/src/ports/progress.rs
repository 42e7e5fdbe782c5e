//! Progress and confirmation ports (driving side of the UI)
//!
//! - [`ITransferObserver`] receives per-object transfer progress. Calls are
//!   made from transfer tasks, so implementations must be cheap and
//!   non-blocking.
//! - [`IPassConfirmation`] is the yes/no gate shown after reconciliation.

use serde::Serialize;

use crate::domain::{Reconciliation, SyncKey};

// ============================================================================
// Transfer progress
// ============================================================================

/// Receives progress for individual downloads
pub trait ITransferObserver: Send + Sync {
    /// A download started. `total` is the `Content-Length`, if announced.
    fn started(&self, key: &SyncKey, total: Option<u64>);

    /// `bytes` more were written to the temporary file
    fn advanced(&self, key: &SyncKey, bytes: u64);

    /// The object was published at its final path
    fn finished(&self, key: &SyncKey);

    /// The transfer failed; `reason` is the rendered error
    fn failed(&self, key: &SyncKey, reason: &str);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransferObserver;

impl ITransferObserver for NoopTransferObserver {
    fn started(&self, _key: &SyncKey, _total: Option<u64>) {}
    fn advanced(&self, _key: &SyncKey, _bytes: u64) {}
    fn finished(&self, _key: &SyncKey) {}
    fn failed(&self, _key: &SyncKey, _reason: &str) {}
}

// ============================================================================
// Confirmation gate
// ============================================================================

/// What the caller is asked to approve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPreview {
    pub missing_count: usize,
    pub missing_bytes: u64,
    pub unsynced_count: usize,
    pub unsynced_bytes: u64,
    pub up_to_date_count: usize,
    /// Keys the reconciler could not classify
    pub issue_count: usize,
    /// Listing records that failed decoding
    pub rejected_count: usize,
    /// Whether confirming will actually start downloads
    pub downloads_enabled: bool,
}

impl TransferPreview {
    pub fn new(reconciliation: &Reconciliation, rejected_count: usize, downloads_enabled: bool) -> Self {
        Self {
            missing_count: reconciliation.missing.len(),
            missing_bytes: reconciliation.total_missing_bytes,
            unsynced_count: reconciliation.unsynced.len(),
            unsynced_bytes: reconciliation.total_unsynced_bytes,
            up_to_date_count: reconciliation.up_to_date.len(),
            issue_count: reconciliation.issues.len(),
            rejected_count,
            downloads_enabled,
        }
    }
}

/// Port trait for the yes/no confirmation before transfers
#[async_trait::async_trait]
pub trait IPassConfirmation: Send + Sync {
    async fn confirm(&self, preview: &TransferPreview) -> anyhow::Result<bool>;
}

/// Confirmation that always answers the same way (`--yes`, tests)
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation(pub bool);

#[async_trait::async_trait]
impl IPassConfirmation for FixedConfirmation {
    async fn confirm(&self, _preview: &TransferPreview) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}
