//! Auth provider port (driven/secondary port)
//!
//! Supplies the bearer token and account identifier a pass needs. The core
//! never inspects the token.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//! - `Ok(None)` means "no usable credentials" (never logged in, or the stored
//!   session was rejected); the orchestrator treats it like an error and
//!   aborts the pass before touching any inventory.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials for one pass
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredentials {
    /// Opaque bearer token
    pub token: String,
    /// Account (user record) identifier used in API paths
    pub account_id: String,
}

impl AuthCredentials {
    pub fn new(token: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            account_id: account_id.into(),
        }
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("token", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Port trait for obtaining credentials
#[async_trait::async_trait]
pub trait IAuthProvider: Send + Sync {
    /// Returns valid credentials, or `None` when the user must log in again
    async fn get_auth(&self) -> anyhow::Result<Option<AuthCredentials>>;
}
