//! Config command - View and manage BlazeSync configuration
//!
//! Provides the `blazesync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Selects the sync folder
//! 4. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blazesync_core::config::Config;
use blazesync_core::domain::SyncSettings;
use clap::Subcommand;
use tracing::info;

use super::CommandContext;
use crate::output::{plural, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "transfer.max_concurrent_downloads")
        key: String,
        /// New value
        value: String,
    },
    /// Select the local folder files are synchronized into
    SetFolder {
        /// Existing directory; relative paths are resolved against the
        /// current directory
        path: PathBuf,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        match self {
            ConfigCommand::Show => execute_show(ctx, &*formatter),
            ConfigCommand::Set { key, value } => execute_set(ctx, &*formatter, key, value),
            ConfigCommand::SetFolder { path } => execute_set_folder(ctx, &*formatter, path),
            ConfigCommand::Validate => execute_validate(ctx, &*formatter),
        }
    }
}

fn execute_show(ctx: &CommandContext, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = ctx.load_config();
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(
    ctx: &CommandContext,
    formatter: &dyn OutputFormatter,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut config = ctx.load_config();
    info!(key = %key, value = %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{}': {}", key, e));
            formatter.info("");
            formatter.info("Supported keys:");
            for (name, help) in SUPPORTED_KEYS {
                formatter.info(&format!("  {:<40} - {}", name, help));
            }
        }
        return Ok(());
    }

    save_checked(ctx, formatter, &config, key, value)
}

fn execute_set_folder(
    ctx: &CommandContext,
    formatter: &dyn OutputFormatter,
    path: &Path,
) -> Result<()> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to resolve the current directory")?
            .join(path)
    };
    if !absolute.is_dir() {
        formatter.error(&format!("{} is not an existing directory", absolute.display()));
        return Ok(());
    }

    let mut config = ctx.load_config();
    config.sync.root = Some(absolute.clone());
    let shown = absolute.display().to_string();
    save_checked(ctx, formatter, &config, "sync.root", &shown)
}

/// Validates `config` (except for the other fields' pre-existing problems)
/// and writes it
fn save_checked(
    ctx: &CommandContext,
    formatter: &dyn OutputFormatter,
    config: &Config,
    key: &str,
    value: &str,
) -> Result<()> {
    let errors: Vec<String> = config
        .validate()
        .iter()
        .filter(|e| e.field == key)
        .map(|e| e.to_string())
        .collect();

    if !errors.is_empty() {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": errors,
            }));
        } else {
            formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
        }
        return Ok(());
    }

    config
        .save(&ctx.config_path)
        .context("Failed to write configuration file")?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": ctx.config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", ctx.config_path.display()));
    }
    Ok(())
}

fn execute_validate(ctx: &CommandContext, formatter: &dyn OutputFormatter) -> Result<()> {
    let config_path = &ctx.config_path;

    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            let message = if config_path.exists() {
                format!("Failed to parse configuration: {e:#}")
            } else {
                "Configuration file not found. Using defaults.".to_string()
            };
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [message],
                }));
            } else if config_path.exists() {
                formatter.error(&message);
                formatter.info(&format!("File: {}", config_path.display()));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info(
                    "Using default configuration. Run 'blazesync config set <key> <value>' to create one.",
                );
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");
    let errors = config.validate();

    if ctx.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            plural(errors.len())
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }
    Ok(())
}

// ============================================================================
// Dot-notation setter
// ============================================================================

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.root", "Sync folder (absolute path, 'none' to clear)"),
    ("sync.settings.<toggle>", "true|false, see below"),
    ("backend.url", "Backend base URL"),
    ("backend.request_timeout_secs", "Whole-request timeout for API calls"),
    ("backend.connect_timeout_secs", "Connection timeout"),
    ("transfer.max_concurrent_downloads", "Parallel downloads (1-32)"),
    ("transfer.transfer_deadline_secs", "Deadline for one download"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.file", "JSON log file path ('none' to disable)"),
];

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false for {}", key),
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Apply a dot-notation key/value pair to a [`Config`]
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    if let Some(toggle) = key.strip_prefix("sync.settings.") {
        let enabled = parse_bool(key, value)?;
        if !config.sync.settings.set(toggle, enabled) {
            anyhow::bail!(
                "Unknown sync setting '{}' (expected one of: {})",
                toggle,
                SyncSettings::KEYS.join(", ")
            );
        }
        return Ok(());
    }

    match key {
        "sync.root" => config.sync.root = optional_path(value),

        "backend.url" => config.backend.url = value.to_string(),
        "backend.request_timeout_secs" => {
            config.backend.request_timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for backend.request_timeout_secs")?;
        }
        "backend.connect_timeout_secs" => {
            config.backend.connect_timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for backend.connect_timeout_secs")?;
        }

        "transfer.max_concurrent_downloads" => {
            config.transfer.max_concurrent_downloads = value
                .parse::<usize>()
                .context("Expected a positive integer")?;
        }
        "transfer.transfer_deadline_secs" => {
            config.transfer.transfer_deadline_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = optional_path(value),

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }
    Ok(())
}
