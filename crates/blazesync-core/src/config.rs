//! Configuration module for BlazeSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, saving, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::SyncSettings;

/// Backend used when none is configured
pub const DEFAULT_BACKEND_URL: &str = "https://pb.blazedcloud.com/";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for BlazeSync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub backend: BackendConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory mirrored from the cloud. `None` until the user picks one.
    pub root: Option<PathBuf>,
    /// Which reconciliation outcomes are acted upon.
    pub settings: SyncSettings,
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend; API paths are joined onto it.
    pub url: String,
    /// Upper bound for a single API request, in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound for establishing a connection, in seconds.
    pub connect_timeout_secs: u64,
}

/// Download settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Number of downloads running at once. `1` downloads sequentially.
    pub max_concurrent_downloads: usize,
    /// Upper bound for one object's download, in seconds.
    pub transfer_deadline_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional JSON log file, written in addition to stderr.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration to `path` (temp file + rename).
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        let tmp_path = {
            let mut p = path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };
        std::fs::write(&tmp_path, yaml).context("Failed to write configuration file")?;
        std::fs::rename(&tmp_path, path).context("Failed to replace configuration file")?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/blazesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("blazesync")
            .join("config.yaml")
    }

    /// Platform-appropriate directory for runtime state (last-sync marker).
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("blazesync")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            transfer_deadline_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.max_concurrent_downloads"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `transfer.max_concurrent_downloads`.
const MAX_CONCURRENT_DOWNLOADS: usize = 32;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- sync ---
        if let Some(root) = &self.sync.root {
            if !root.is_absolute() {
                push("sync.root", format!("must be an absolute path: {}", root.display()));
            } else if !root.is_dir() {
                push("sync.root", format!("directory does not exist: {}", root.display()));
            }
        }

        // --- backend ---
        match url::Url::parse(&self.backend.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => push(
                "backend.url",
                format!("unsupported scheme '{}'; expected http or https", url.scheme()),
            ),
            Err(e) => push("backend.url", format!("invalid URL: {e}")),
        }
        if self.backend.request_timeout_secs == 0 {
            push("backend.request_timeout_secs", "must be greater than 0".into());
        }
        if self.backend.connect_timeout_secs == 0 {
            push("backend.connect_timeout_secs", "must be greater than 0".into());
        }

        // --- transfer ---
        if self.transfer.max_concurrent_downloads == 0
            || self.transfer.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS
        {
            push(
                "transfer.max_concurrent_downloads",
                format!("must be in range 1..={MAX_CONCURRENT_DOWNLOADS}"),
            );
        }
        if self.transfer.transfer_deadline_secs == 0 {
            push("transfer.transfer_deadline_secs", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use blazesync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_root(PathBuf::from("/home/user/BlazedCloud"))
///     .max_concurrent_downloads(2)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_root(mut self, root: PathBuf) -> Self {
        self.config.sync.root = Some(root);
        self
    }

    pub fn sync_settings(mut self, settings: SyncSettings) -> Self {
        self.config.sync.settings = settings;
        self
    }

    // --- backend ---

    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend.url = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.backend.request_timeout_secs = seconds;
        self
    }

    pub fn connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.backend.connect_timeout_secs = seconds;
        self
    }

    // --- transfer ---

    pub fn max_concurrent_downloads(mut self, n: usize) -> Self {
        self.config.transfer.max_concurrent_downloads = n;
        self
    }

    pub fn transfer_deadline_secs(mut self, seconds: u64) -> Self {
        self.config.transfer.transfer_deadline_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
