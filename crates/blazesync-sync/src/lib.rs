//! BlazeSync Sync - One-way cloud-to-local synchronization
//!
//! Provides:
//! - The sync pass orchestrator (auth, inventories, reconcile, confirm, transfer)
//! - A local walker that builds the local inventory
//! - A streaming download engine with atomic publication
//! - The JSON last-sync marker store
//!
//! ## Modules
//!
//! - [`engine`] - [`SyncOrchestrator`](engine::SyncOrchestrator), one pass at a time
//! - [`filesystem`] - Local walker and temp-file cleanup
//! - [`transfer`] - [`TransferEngine`](transfer::TransferEngine)
//! - [`state`] - [`JsonStateStore`](state::JsonStateStore)

pub mod engine;
pub mod filesystem;
pub mod state;
pub mod transfer;

use std::path::PathBuf;

use blazesync_core::domain::errors::DomainError;
use thiserror::Error;

pub use blazesync_core::domain::TEMP_FILE_SUFFIX;

/// Errors that abort a whole sync pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// No credentials, or the credential provider failed
    #[error("Authentication unavailable: {0}")]
    AuthUnavailable(String),

    /// The remote listing could not be fetched or decoded as a whole
    #[error("Failed to fetch remote inventory: {0}")]
    InventoryFetchFailed(String),

    /// The sync root could not be walked
    #[error("Failed to read sync root {path}: {message}")]
    LocalInventory { path: PathBuf, message: String },

    /// Another pass holds the guard
    #[error("A sync pass is already running")]
    PassInProgress,

    /// The pass was cancelled before it finished
    #[error("Sync pass cancelled")]
    Cancelled,

    /// An I/O error outside of per-object transfers
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain-level error propagated from blazesync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Errors for a single object download
///
/// Each one is isolated to its object; the pass carries on with the rest.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote `lastModified` does not parse
    #[error("Malformed timestamp {value:?}")]
    MalformedTimestamp { value: String },

    /// Another task is already downloading this key
    #[error("Transfer already in flight")]
    AlreadyInFlight,

    /// The download URL could not be obtained
    #[error("Could not resolve download URL: {0}")]
    UrlResolution(String),

    /// The download URL answered with a non-success status
    #[error("Remote rejected download with status {status}")]
    RemoteRejected { status: u16 },

    /// The connection or body stream failed
    #[error("Network error: {0}")]
    Network(String),

    /// The per-transfer deadline elapsed
    #[error("Transfer timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// The pass was cancelled
    #[error("Transfer cancelled")]
    Cancelled,

    /// Moving the temp file into place failed
    #[error("Failed to publish {path}: {message}")]
    PublishFailed { path: PathBuf, message: String },

    /// Any other local filesystem failure (directories, temp file, mtime)
    #[error("Filesystem error at {path}: {message}")]
    Filesystem { path: PathBuf, message: String },
}

impl TransferError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Filesystem {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
