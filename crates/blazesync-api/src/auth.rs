//! Password login, token refresh and session persistence
//!
//! ## Components
//!
//! - [`StoredSession`] - The token and account id saved between runs
//! - [`ISessionStore`] - Where a session lives
//! - [`KeyringSessionStore`] - The OS credential store (GNOME Keyring, KWallet, Keychain)
//! - [`MemorySessionStore`] - In-process store for tests and one-shot runs
//! - [`BackendAuthProvider`] - [`IAuthProvider`] that refreshes the stored token before each pass

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use blazesync_core::ports::{AuthCredentials, IAuthProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{AuthResponse, BackendClient};
use crate::ApiError;

/// Keyring service name for the saved session
pub const KEYRING_SERVICE: &str = "blazesync";

/// Keyring user the session is filed under
pub const KEYRING_USER: &str = "default";

// ============================================================================
// StoredSession
// ============================================================================

/// A logged-in session as persisted between runs
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub account_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl StoredSession {
    fn from_response(response: AuthResponse, fallback_email: Option<&str>) -> Self {
        Self {
            token: response.token,
            account_id: response.record.id,
            email: response
                .record
                .email
                .or_else(|| fallback_email.map(str::to_string)),
        }
    }

    pub fn credentials(&self) -> AuthCredentials {
        AuthCredentials::new(self.token.clone(), self.account_id.clone())
    }
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .finish()
    }
}

/// Persistence for [`StoredSession`]
pub trait ISessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>>;
    fn store(&self, session: &StoredSession) -> Result<()>;
    /// Removing a session that does not exist is not an error
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// KeyringSessionStore
// ============================================================================

/// Stores the session as JSON in the system keyring
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
    user: String,
}

impl KeyringSessionStore {
    pub fn new() -> Self {
        Self::with_entry(KEYRING_SERVICE, KEYRING_USER)
    }

    /// Uses a custom service/user pair
    pub fn with_entry(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.user).context("Failed to create keyring entry")
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ISessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let session: StoredSession = serde_json::from_str(&json)
                    .context("Failed to deserialize session from keyring")?;
                debug!(account_id = %session.account_id, "Loaded session from keyring");
                Ok(Some(session))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No session found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn store(&self, session: &StoredSession) -> Result<()> {
        let json = serde_json::to_string(session).context("Failed to serialize session")?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store session in keyring")?;
        debug!(account_id = %session.account_id, "Stored session in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!("Cleared session from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// MemorySessionStore
// ============================================================================

/// Keeps the session in memory only
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ISessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.slot().clone())
    }

    fn store(&self, session: &StoredSession) -> Result<()> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

// ============================================================================
// BackendAuthProvider
// ============================================================================

/// Supplies credentials from the stored session, refreshed against the
/// backend before they are handed out
///
/// A session the backend refuses (401/403, or any other 4xx) is cleared, and
/// the user must log in again. Network and server failures leave it in place.
pub struct BackendAuthProvider {
    client: Arc<BackendClient>,
    store: Arc<dyn ISessionStore>,
}

impl BackendAuthProvider {
    pub fn new(client: Arc<BackendClient>, store: Arc<dyn ISessionStore>) -> Self {
        Self { client, store }
    }

    /// Authenticates with email and password and saves the session
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<StoredSession> {
        let response = self
            .client
            .auth_with_password(email, password)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized { .. } | ApiError::Rejected { .. } => {
                    anyhow::anyhow!("Invalid email or password")
                }
                other => anyhow::Error::new(other).context("Login request failed"),
            })?;

        let session = StoredSession::from_response(response, Some(email));
        self.store.store(&session)?;
        info!(account_id = %session.account_id, "Logged in");
        Ok(session)
    }

    /// Forgets the stored session
    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }

    /// The stored session, without contacting the backend
    pub fn current_session(&self) -> Result<Option<StoredSession>> {
        self.store.load()
    }
}

#[async_trait::async_trait]
impl IAuthProvider for BackendAuthProvider {
    async fn get_auth(&self) -> Result<Option<AuthCredentials>> {
        let Some(saved) = self.store.load()? else {
            debug!("No stored session");
            return Ok(None);
        };

        match self.client.auth_refresh(&saved.token).await {
            Ok(response) => {
                let session = StoredSession::from_response(response, saved.email.as_deref());
                if let Err(e) = self.store.store(&session) {
                    warn!(error = %e, "Failed to save refreshed session");
                }
                Ok(Some(session.credentials()))
            }
            Err(e @ (ApiError::Unauthorized { .. } | ApiError::Rejected { .. })) => {
                warn!(error = %e, "Stored session was refused, clearing it");
                self.store.clear()?;
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to refresh session")),
        }
    }
}
