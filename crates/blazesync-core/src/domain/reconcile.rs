//! Reconciler
//!
//! Pure diff between a remote and a local inventory. The result drives the
//! confirmation prompt and the transfer phase, and is safe to compute
//! repeatedly for previews.
//!
//! Output order follows input order, so identical inputs always produce
//! identical output.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use super::inventory::{LocalFile, RemoteObject};
use super::key::SyncKey;
use super::staleness::is_local_newer_than;

/// Why a local file is considered unsynced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsyncedReason {
    /// The key does not exist remotely
    NotOnServer,
    /// The key exists remotely but the local copy is newer
    ServerOutdated,
}

/// A local file the server does not have an up-to-date copy of
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsyncedFile {
    pub key: SyncKey,
    pub absolute_path: PathBuf,
    pub size: u64,
    pub reason: UnsyncedReason,
}

/// Inputs the reconciler could not classify
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileIssue {
    /// The remote `lastModified` did not parse; the key is left out of both
    /// `missing` and `unsynced`
    MalformedTimestamp { key: SyncKey, value: String },
    /// The listing contained the same key more than once; the first entry
    /// was used
    DuplicateKey { key: SyncKey },
    /// The remote key ends with the in-progress download suffix; the local
    /// walker would delete it after every download, so it is never fetched
    ReservedName { key: SyncKey },
}

impl std::fmt::Display for ReconcileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileIssue::MalformedTimestamp { key, value } => {
                write!(f, "{key}: malformed lastModified {value:?}")
            }
            ReconcileIssue::DuplicateKey { key } => write!(f, "{key}: duplicate key in listing"),
            ReconcileIssue::ReservedName { key } => {
                write!(f, "{key}: name ends with a reserved suffix, not downloaded")
            }
        }
    }
}

/// Result of [`reconcile`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Remote objects absent locally (placeholders excluded)
    pub missing: Vec<RemoteObject>,
    /// Local files absent remotely or newer than the remote copy
    pub unsynced: Vec<UnsyncedFile>,
    /// Keys present on both sides where the local copy is not newer
    pub up_to_date: Vec<SyncKey>,
    pub total_missing_bytes: u64,
    pub total_unsynced_bytes: u64,
    pub issues: Vec<ReconcileIssue>,
}

impl Reconciliation {
    /// Whether there is anything to transfer in either direction
    pub fn has_work(&self) -> bool {
        !self.missing.is_empty() || !self.unsynced.is_empty()
    }
}

/// Diff `remote` against `local`.
pub fn reconcile(remote: &[RemoteObject], local: &[LocalFile]) -> Reconciliation {
    let local_keys: HashSet<&SyncKey> = local.iter().map(|file| &file.key).collect();
    let mut remote_by_key: HashMap<&SyncKey, &RemoteObject> = HashMap::with_capacity(remote.len());
    let mut result = Reconciliation::default();

    for object in remote {
        if remote_by_key.contains_key(&object.key) {
            result.issues.push(ReconcileIssue::DuplicateKey {
                key: object.key.clone(),
            });
            continue;
        }
        remote_by_key.insert(&object.key, object);

        if object.key.is_placeholder() || local_keys.contains(&object.key) {
            continue;
        }

        if object.key.is_temp_name() {
            result.issues.push(ReconcileIssue::ReservedName {
                key: object.key.clone(),
            });
            continue;
        }

        // Without a valid timestamp the file could not be stamped after
        // download, and the next pass would misclassify it.
        if object.modified_at().is_err() {
            result.issues.push(ReconcileIssue::MalformedTimestamp {
                key: object.key.clone(),
                value: object.last_modified.clone(),
            });
            continue;
        }

        result.total_missing_bytes = result
            .total_missing_bytes
            .saturating_add(object.reported_size());
        result.missing.push(object.clone());
    }

    for file in local {
        let reason = match remote_by_key.get(&file.key) {
            None => UnsyncedReason::NotOnServer,
            Some(object) => match is_local_newer_than(file.modified_at, object) {
                Ok(true) => UnsyncedReason::ServerOutdated,
                Ok(false) => {
                    result.up_to_date.push(file.key.clone());
                    continue;
                }
                Err(_) => {
                    result.issues.push(ReconcileIssue::MalformedTimestamp {
                        key: file.key.clone(),
                        value: object.last_modified.clone(),
                    });
                    continue;
                }
            },
        };

        result.total_unsynced_bytes = result.total_unsynced_bytes.saturating_add(file.size);
        result.unsynced.push(UnsyncedFile {
            key: file.key.clone(),
            absolute_path: file.absolute_path.clone(),
            size: file.size,
            reason,
        });
    }

    result
}
