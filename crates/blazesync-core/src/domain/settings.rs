//! Sync settings toggles
//!
//! Six switches decide which reconciliation outcomes are acted upon. Only
//! `download_missing_files` currently has an effect; the rest are kept so
//! existing configuration round-trips and so the pass summary can say what
//! was requested but not performed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    #[serde(alias = "downloadMissingFiles")]
    pub download_missing_files: bool,
    #[serde(alias = "uploadUnsyncedFiles")]
    pub upload_unsynced_files: bool,
    #[serde(alias = "deleteUnsyncedFiles")]
    pub delete_unsynced_files: bool,
    #[serde(alias = "deleteMissingFiles")]
    pub delete_missing_files: bool,
    #[serde(alias = "deletePlaceholderFiles")]
    pub delete_placeholder_files: bool,
    #[serde(alias = "deleteEmptyFolders")]
    pub delete_empty_folders: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            download_missing_files: true,
            upload_unsynced_files: true,
            delete_unsynced_files: true,
            delete_missing_files: true,
            delete_placeholder_files: true,
            delete_empty_folders: true,
        }
    }
}

impl SyncSettings {
    /// Names of every toggle, in configuration-key form
    pub const KEYS: [&'static str; 6] = [
        "download_missing_files",
        "upload_unsynced_files",
        "delete_unsynced_files",
        "delete_missing_files",
        "delete_placeholder_files",
        "delete_empty_folders",
    ];

    /// Look up a toggle by its configuration key
    pub fn get(&self, key: &str) -> Option<bool> {
        Some(match key {
            "download_missing_files" => self.download_missing_files,
            "upload_unsynced_files" => self.upload_unsynced_files,
            "delete_unsynced_files" => self.delete_unsynced_files,
            "delete_missing_files" => self.delete_missing_files,
            "delete_placeholder_files" => self.delete_placeholder_files,
            "delete_empty_folders" => self.delete_empty_folders,
            _ => return None,
        })
    }

    /// Set a toggle by its configuration key; returns `false` for an
    /// unknown key.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        let slot = match key {
            "download_missing_files" => &mut self.download_missing_files,
            "upload_unsynced_files" => &mut self.upload_unsynced_files,
            "delete_unsynced_files" => &mut self.delete_unsynced_files,
            "delete_missing_files" => &mut self.delete_missing_files,
            "delete_placeholder_files" => &mut self.delete_placeholder_files,
            "delete_empty_folders" => &mut self.delete_empty_folders,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Enabled toggles that have no implementation behind them
    pub fn inert_enabled(&self) -> Vec<&'static str> {
        Self::KEYS
            .iter()
            .copied()
            .filter(|key| *key != "download_missing_files")
            .filter(|key| self.get(key).unwrap_or(false))
            .collect()
    }
}
