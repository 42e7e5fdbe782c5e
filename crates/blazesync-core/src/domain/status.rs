//! Sync pass identity and status
//!
//! [`SyncStatus`] is what a UI polls; its `Display` form is the status line
//! shown to the user.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Identifier for one sync pass, attached to log spans and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassId(Uuid);

impl PassId {
    /// Create a new random PassId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PassId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid PassId: {e}")))
    }
}

/// Observable state of the orchestrator
///
/// `Idle -> Syncing -> (Synced | Failed)`; `FolderNotSelected` is reported
/// when a pass is requested without a sync root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No sync root configured
    FolderNotSelected,
    /// No pass has run yet
    Idle,
    /// A pass is running
    Syncing,
    /// The last pass reached its end
    Synced,
    /// The last pass aborted
    Failed(String),
}

impl SyncStatus {
    /// Returns true while a pass holds the guard
    pub fn is_running(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// Returns true if the last pass aborted
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncStatus::Failed(_))
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Idle
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::FolderNotSelected => write!(f, "Folder not selected"),
            SyncStatus::Idle => write!(f, "Idle"),
            SyncStatus::Syncing => write!(f, "Syncing"),
            SyncStatus::Synced => write!(f, "Synced"),
            SyncStatus::Failed(reason) => write!(f, "Sync failed: {}", reason),
        }
    }
}
