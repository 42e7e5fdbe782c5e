//! Inventory model
//!
//! Snapshots of the remote store and of the local sync root. Both are
//! recomputed on every pass; nothing here is persisted.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::key::SyncKey;
use super::timestamp::parse_wire_timestamp;

// ============================================================================
// Remote side
// ============================================================================

/// One object from the remote listing, after container stripping and key
/// canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Canonical key (container segment already removed)
    pub key: SyncKey,
    /// Size in bytes, when the listing reports one
    pub size: Option<u64>,
    /// `lastModified` exactly as received; parsed on demand
    pub last_modified: String,
    /// Entity tag, retained for future integrity checks
    pub etag: Option<String>,
    /// Advisory storage class
    pub storage_class: Option<String>,
}

impl RemoteObject {
    /// Creates a remote object with only the fields reconciliation needs
    pub fn new(key: SyncKey, size: Option<u64>, last_modified: impl Into<String>) -> Self {
        Self {
            key,
            size,
            last_modified: last_modified.into(),
            etag: None,
            storage_class: None,
        }
    }

    /// Parsed modification time
    ///
    /// # Errors
    /// [`DomainError::MalformedTimestamp`] when the wire value does not match
    /// the fixed format.
    pub fn modified_at(&self) -> Result<DateTime<Utc>, DomainError> {
        parse_wire_timestamp(&self.last_modified)
    }

    /// Size for reporting purposes (unknown counts as zero)
    pub fn reported_size(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

/// A listing record that could not be decoded into a [`RemoteObject`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position of the record in the listing
    pub index: usize,
    /// The raw key, if the record carried a readable one
    pub key: Option<String>,
    /// Why the record was rejected
    pub reason: String,
}

/// Result of fetching the remote listing
///
/// Valid records populate `objects`; a record that fails strict decoding is
/// reported in `rejected` without discarding the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInventory {
    pub objects: Vec<RemoteObject>,
    pub rejected: Vec<RejectedRecord>,
}

impl RemoteInventory {
    pub fn new(objects: Vec<RemoteObject>) -> Self {
        Self {
            objects,
            rejected: Vec::new(),
        }
    }
}

// ============================================================================
// Local side
// ============================================================================

/// A regular file found under the sync root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Canonical key derived from `relative_path`
    pub key: SyncKey,
    /// Path relative to the sync root, host separators
    pub relative_path: PathBuf,
    /// Resolved absolute path
    pub absolute_path: PathBuf,
    /// Size in bytes at walk time
    pub size: u64,
    /// Modification time at walk time
    pub modified_at: DateTime<Utc>,
}

/// An entry the walker could not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIssue {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for LocalIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of walking the sync root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalInventory {
    pub files: Vec<LocalFile>,
    /// Leftover transfer temp files deleted during the walk
    pub removed_temp_files: Vec<PathBuf>,
    /// Entries skipped because they could not be read or removed
    pub issues: Vec<LocalIssue>,
}

impl LocalInventory {
    pub fn new(files: Vec<LocalFile>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }
}
