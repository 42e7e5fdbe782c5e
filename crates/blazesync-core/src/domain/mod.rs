//! Domain entities and business logic
//!
//! This module contains the core domain types for BlazeSync:
//! - Canonical keys and wire timestamps
//! - Remote and local inventories
//! - The staleness oracle and the reconciler
//! - Sync settings, pass status and identifiers
//! - Domain-specific error types

pub mod errors;
pub mod inventory;
pub mod key;
pub mod reconcile;
pub mod settings;
pub mod staleness;
pub mod status;
pub mod timestamp;
pub mod units;

// Re-export commonly used types
pub use errors::DomainError;
pub use inventory::{
    LocalFile, LocalInventory, LocalIssue, RejectedRecord, RemoteInventory, RemoteObject,
};
pub use key::{SyncKey, PLACEHOLDER_SUFFIX, TEMP_FILE_SUFFIX};
pub use reconcile::{reconcile, ReconcileIssue, Reconciliation, UnsyncedFile, UnsyncedReason};
pub use settings::SyncSettings;
pub use staleness::{is_local_newer, is_local_newer_than, is_same_size};
pub use status::{PassId, SyncStatus};
pub use timestamp::{format_wire_timestamp, parse_wire_timestamp};
pub use units::format_bytes;
