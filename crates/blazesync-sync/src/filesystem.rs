//! Local filesystem adapter (secondary/driven adapter)
//!
//! Walks the sync root with `tokio::fs` and builds the [`LocalInventory`].
//!
//! ## Design Decisions
//!
//! - **Temp-file cleanup**: Leftover `*.blazesync-part` files from an
//!   interrupted download are deleted on sight and never reported as local
//!   content.
//! - **Symlinks**: Not followed. Only regular files are inventoried.
//! - **Isolation**: An entry that cannot be stat'ed, or whose name does not
//!   form a valid key, becomes a [`LocalIssue`]; the walk continues. Only an
//!   unreadable root fails the scan.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use blazesync_core::domain::{LocalFile, LocalInventory, LocalIssue, SyncKey};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::{SyncError, TEMP_FILE_SUFFIX};

/// Adapter that builds a [`LocalInventory`] from the real filesystem.
///
/// This is a zero-sized struct; the sync root is passed to each call.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Walk `root` recursively and return every regular file under it.
    ///
    /// # Errors
    /// [`SyncError::LocalInventory`] if `root` itself cannot be read.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn scan(&self, root: &Path) -> Result<LocalInventory, SyncError> {
        let mut entries =
            tokio::fs::read_dir(root)
                .await
                .map_err(|err| SyncError::LocalInventory {
                    path: root.to_path_buf(),
                    message: err.to_string(),
                })?;

        let mut inventory = LocalInventory::default();
        // The root listing is already open; subdirectories go through the
        // recursive walker, which isolates their failures.
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    return Err(SyncError::LocalInventory {
                        path: root.to_path_buf(),
                        message: err.to_string(),
                    })
                }
            };
            self.visit(root, entry.path(), &mut inventory).await;
        }

        debug!(
            files = inventory.files.len(),
            removed_temp_files = inventory.removed_temp_files.len(),
            issues = inventory.issues.len(),
            "local scan complete"
        );
        Ok(inventory)
    }

    /// Recursively walks a subdirectory, recording failures as issues
    fn walk_directory<'a>(
        &'a self,
        root: &'a Path,
        dir: PathBuf,
        inventory: &'a mut LocalInventory,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    record_issue(inventory, dir, format!("cannot read directory: {err}"));
                    return;
                }
            };

            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => self.visit(root, entry.path(), inventory).await,
                    Ok(None) => break,
                    Err(err) => {
                        record_issue(inventory, dir, format!("cannot list directory: {err}"));
                        break;
                    }
                }
            }
        })
    }

    /// Classifies one directory entry
    async fn visit(&self, root: &Path, path: PathBuf, inventory: &mut LocalInventory) {
        // symlink_metadata so links are seen as links, not as their targets
        let metadata = match tokio::fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) => {
                record_issue(inventory, path, format!("cannot stat: {err}"));
                return;
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            self.walk_directory(root, path, inventory).await;
            return;
        }
        if !file_type.is_file() {
            debug!(path = %path.display(), "skipping non-regular file");
            return;
        }

        if is_temp_file(&path) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "removed leftover temp file");
                    inventory.removed_temp_files.push(path);
                }
                Err(err) => {
                    record_issue(inventory, path, format!("cannot remove temp file: {err}"));
                }
            }
            return;
        }

        let relative_path = match path.strip_prefix(root) {
            Ok(relative) => relative.to_path_buf(),
            Err(err) => {
                record_issue(inventory, path, err.to_string());
                return;
            }
        };
        let key = match SyncKey::from_relative_path(&relative_path) {
            Ok(key) => key,
            Err(err) => {
                record_issue(inventory, path, err.to_string());
                return;
            }
        };
        let modified_at: DateTime<Utc> = match metadata.modified() {
            Ok(modified) => modified.into(),
            Err(err) => {
                record_issue(inventory, path, format!("no modification time: {err}"));
                return;
            }
        };

        inventory.files.push(LocalFile {
            key,
            relative_path,
            absolute_path: path,
            size: metadata.len(),
            modified_at,
        });
    }
}

/// Whether `path` is an in-progress (or abandoned) download
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(TEMP_FILE_SUFFIX))
        .unwrap_or(false)
}

fn record_issue(inventory: &mut LocalInventory, path: PathBuf, message: String) {
    warn!(path = %path.display(), %message, "skipping local entry");
    inventory.issues.push(LocalIssue { path, message });
}

// ============================================================================
// Unit tests
// ============================================================================
