//! Remote inventory port (driven/secondary port)
//!
//! The listing and URL-issuing service of the backend. Implementations own
//! wire decoding: the container segment is stripped and keys are
//! canonicalized before a [`RemoteObject`](crate::domain::RemoteObject)
//! reaches the core.

use thiserror::Error;
use url::Url;

use crate::domain::{RemoteInventory, SyncKey};

use super::auth_provider::AuthCredentials;

/// A failed remote call, classified by the adapter that made it
///
/// Adapters attach this to the errors they return so the orchestrator can
/// decide on retries without inspecting messages. Errors that carry no
/// [`RemoteError`] are treated as permanent.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    transient: bool,
    message: String,
}

impl RemoteError {
    /// A failure worth retrying (network, rate limiting, 5xx)
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            transient: true,
            message: message.into(),
        }
    }

    /// A failure that will not go away on its own
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            transient: false,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// The first [`RemoteError`] in the chain of `err`, if any
    pub fn find(err: &anyhow::Error) -> Option<&RemoteError> {
        err.chain().find_map(|cause| cause.downcast_ref::<RemoteError>())
    }
}

/// Port trait for the remote listing and download URL service
#[async_trait::async_trait]
pub trait IRemoteInventory: Send + Sync {
    /// Fetch the full listing for the account
    ///
    /// A non-success response is an error; per-record decode failures are
    /// reported in [`RemoteInventory::rejected`] instead.
    async fn list_objects(&self, credentials: &AuthCredentials) -> anyhow::Result<RemoteInventory>;

    /// Obtain a time-limited direct URL for `key`
    ///
    /// Keys are always sent with `/` separators regardless of host.
    async fn resolve_download_url(
        &self,
        credentials: &AuthCredentials,
        key: &SyncKey,
    ) -> anyhow::Result<Url>;
}

/// The `key -> URL` function the transfer engine depends on
#[async_trait::async_trait]
pub trait IDownloadUrlResolver: Send + Sync {
    async fn resolve(&self, key: &SyncKey) -> anyhow::Result<Url>;
}
