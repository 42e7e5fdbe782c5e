//! Port definitions (hexagonal architecture interfaces)
//!
//! Traits the sync orchestrator depends on; their implementations live in
//! `blazesync-api` (backend, credentials), `blazesync-sync` (state file) and
//! `blazesync-cli` (prompts, progress bars).
//!
//! ## Ports Overview
//!
//! - [`IAuthProvider`] - Bearer token and account identifier
//! - [`IRemoteInventory`] - Remote listing and download URL issuing
//! - [`IDownloadUrlResolver`] - `key -> URL`, as consumed by the transfer engine
//! - [`ILastSyncStore`] - The persisted last-sync marker
//! - [`ITransferObserver`] / [`IPassConfirmation`] - Progress and the yes/no gate

pub mod auth_provider;
pub mod progress;
pub mod remote_inventory;
pub mod state_store;

pub use auth_provider::{AuthCredentials, IAuthProvider};
pub use progress::{
    FixedConfirmation, IPassConfirmation, ITransferObserver, NoopTransferObserver, TransferPreview,
};
pub use remote_inventory::{IDownloadUrlResolver, IRemoteInventory, RemoteError};
pub use state_store::ILastSyncStore;
