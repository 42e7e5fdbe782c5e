//! BlazedCloud backend HTTP client
//!
//! Thin typed wrapper over `reqwest` for the endpoints a sync pass needs.
//! Every request carries the `blazesync/<version>` user agent; authenticated
//! ones add the bearer token from [`AuthCredentials`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blazesync_api::client::BackendClient;
//! use blazesync_core::config::BackendConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = BackendClient::new(&BackendConfig::default())?;
//! println!("{}", client.health().await?);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use blazesync_core::config::BackendConfig;
use blazesync_core::ports::AuthCredentials;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::ApiError;

/// Sent with every request
pub const USER_AGENT: &str = concat!("blazesync/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Backend response types
// ============================================================================

/// Response of the password and refresh endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: AuthRecord,
}

/// The user record embedded in [`AuthResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    message: String,
}

// ============================================================================
// BackendClient
// ============================================================================

/// HTTP client for the BlazedCloud backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    /// Always ends with `/`
    base_url: String,
}

impl BackendClient {
    /// Creates a client for `config.url` with the configured timeouts
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: normalize_base(&config.url),
        })
    }

    /// Creates a client with default settings and a custom base URL (useful
    /// for testing)
    pub fn with_base_url(base_url: impl AsRef<str>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            base_url: normalize_base(base_url.as_ref()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request builder for `path`, relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    fn authorized(&self, method: Method, path: &str, credentials: &AuthCredentials) -> RequestBuilder {
        self.request(method, path).bearer_auth(&credentials.token)
    }

    /// `GET api/health`; returns the backend's status message
    pub async fn health(&self) -> Result<String, ApiError> {
        let response = checked(self.request(Method::GET, "api/health").send().await?).await?;
        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("health: {e}")))?;
        Ok(health.message)
    }

    /// `GET data/usage/{account}`; storage used, as reported (bytes)
    pub async fn usage(&self, credentials: &AuthCredentials) -> Result<String, ApiError> {
        let path = format!("data/usage/{}", credentials.account_id);
        let response = checked(self.authorized(Method::GET, &path, credentials).send().await?).await?;
        Ok(response.text().await?.trim().to_string())
    }

    /// `GET data/listall/{account}`; the raw listing records
    ///
    /// Records are returned undecoded so a single bad record can be rejected
    /// without losing the rest.
    pub async fn list_all(
        &self,
        credentials: &AuthCredentials,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let path = format!("data/listall/{}", credentials.account_id);
        debug!(account_id = %credentials.account_id, "Fetching remote listing");

        let response = checked(self.authorized(Method::GET, &path, credentials).send().await?).await?;
        let body = response.bytes().await?;
        let records: Vec<serde_json::Value> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("listing is not a JSON array: {e}")))?;

        debug!(records = records.len(), "Remote listing received");
        Ok(records)
    }

    /// `POST data/down/{account}`; a time-limited direct URL for `key`
    ///
    /// `key` must already use `/` separators.
    pub async fn download_url(
        &self,
        credentials: &AuthCredentials,
        key: &str,
    ) -> Result<Url, ApiError> {
        let path = format!("data/down/{}", credentials.account_id);
        let response = checked(
            self.authorized(Method::POST, &path, credentials)
                .form(&[("filename", key), ("useShlink", "false")])
                .send()
                .await?,
        )
        .await?;

        let body = response.text().await?;
        let raw = body.trim().trim_matches('"');
        Url::parse(raw).map_err(|e| {
            ApiError::InvalidResponse(format!("download URL {raw:?} for {key}: {e}"))
        })
    }

    /// `POST api/collections/users/auth-with-password`
    pub async fn auth_with_password(
        &self,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let response = checked(
            self.request(Method::POST, "api/collections/users/auth-with-password")
                .form(&[("identity", identity), ("password", password)])
                .send()
                .await?,
        )
        .await?;
        parse_auth(response).await
    }

    /// `POST api/collections/users/auth-refresh`; exchanges `token` for a
    /// fresh one
    pub async fn auth_refresh(&self, token: &str) -> Result<AuthResponse, ApiError> {
        let response = checked(
            self.request(Method::POST, "api/collections/users/auth-refresh")
                .bearer_auth(token)
                .send()
                .await?,
        )
        .await?;
        parse_auth(response).await
    }
}

fn normalize_base(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Turns a non-success response into an [`ApiError`]
async fn checked(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, body))
}

async fn parse_auth(response: Response) -> Result<AuthResponse, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("auth response: {e}")))
}
