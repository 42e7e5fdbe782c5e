//! BlazeSync API - BlazedCloud backend client
//!
//! Provides:
//! - A typed HTTP client for the listing, download-URL and auth endpoints
//! - The remote inventory provider (strict per-record decoding)
//! - Session storage in the system keyring and the refreshing auth provider
//!
//! ## Modules
//!
//! - [`client`] - [`BackendClient`](client::BackendClient)
//! - [`provider`] - [`BackendInventoryProvider`](provider::BackendInventoryProvider)
//! - [`auth`] - [`KeyringSessionStore`](auth::KeyringSessionStore) and
//!   [`BackendAuthProvider`](auth::BackendAuthProvider)

pub mod auth;
pub mod client;
pub mod provider;

use blazesync_core::ports::RemoteError;
use thiserror::Error;

/// Errors that can occur when talking to the BlazedCloud backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token was missing, expired or revoked (401/403)
    #[error("Unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// Any other 4xx response
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether the backend refused the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Whether retrying the same request may succeed
    ///
    /// Network failures, rate limiting (429) and server errors (5xx) are
    /// transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::ServerError { .. } => true,
            ApiError::Rejected { status, .. } => *status == 429,
            ApiError::Unauthorized { .. } | ApiError::InvalidResponse(_) => false,
        }
    }

    /// Map a non-success status and its body to an error
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let code = status.as_u16();
        match code {
            401 | 403 => ApiError::Unauthorized { status: code, body },
            _ if status.is_server_error() => ApiError::ServerError { status: code, body },
            _ => ApiError::Rejected { status: code, body },
        }
    }
}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        if err.is_transient() {
            RemoteError::transient(err.to_string())
        } else {
            RemoteError::permanent(err.to_string())
        }
    }
}
