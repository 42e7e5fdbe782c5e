//! Subcommand implementations

pub mod auth;
pub mod completions;
pub mod config;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use blazesync_api::auth::{BackendAuthProvider, KeyringSessionStore};
use blazesync_api::client::BackendClient;
use blazesync_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options every command receives
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
}

impl CommandContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn load_config(&self) -> Config {
        Config::load_or_default(&self.config_path)
    }
}

/// Backend client plus the keyring-backed auth provider
pub(crate) fn backend(config: &Config) -> Result<(Arc<BackendClient>, BackendAuthProvider)> {
    let client = Arc::new(
        BackendClient::new(&config.backend).context("Failed to create backend client")?,
    );
    let auth = BackendAuthProvider::new(client.clone(), Arc::new(KeyringSessionStore::new()));
    Ok((client, auth))
}
