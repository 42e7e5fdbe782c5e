//! Status command - Display synchronization status
//!
//! Shows the sync folder, the last successful pass, the stored session,
//! the sync settings, backend reachability and storage used.

use anyhow::Result;
use blazesync_api::auth::StoredSession;
use blazesync_api::client::BackendClient;
use blazesync_core::config::Config;
use blazesync_core::domain::{format_bytes, SyncSettings};
use blazesync_core::ports::ILastSyncStore;
use blazesync_sync::state::JsonStateStore;
use chrono::{DateTime, Utc};
use clap::Args;
use tracing::{debug, info};

use super::{backend, CommandContext};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Skip the backend health and usage queries
    #[arg(long)]
    pub offline: bool,
}

/// Outcome of a backend query, rendered as-is
enum Probe {
    Ok(String),
    Failed(String),
    Skipped,
}

impl Probe {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Probe::Ok(value) => serde_json::json!({ "ok": true, "value": value }),
            Probe::Failed(error) => serde_json::json!({ "ok": false, "error": error }),
            Probe::Skipped => serde_json::Value::Null,
        }
    }

    fn render(&self) -> String {
        match self {
            Probe::Ok(value) => value.clone(),
            Probe::Failed(error) => format!("unavailable ({error})"),
            Probe::Skipped => "not checked".to_string(),
        }
    }
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let (client, auth) = backend(&config)?;

        let store = JsonStateStore::in_dir(&Config::default_data_dir());
        let last_sync = match store.last_sync().await {
            Ok(at) => at,
            Err(e) => {
                formatter.warn(&format!("Could not read last sync time: {e:#}"));
                None
            }
        };

        let session = match auth.current_session() {
            Ok(session) => session,
            Err(e) => {
                formatter.warn(&format!("Could not read stored session: {e:#}"));
                None
            }
        };

        let (health, usage) = if self.offline {
            (Probe::Skipped, Probe::Skipped)
        } else {
            probe_backend(&client, session.as_ref()).await
        };
        info!(offline = self.offline, "Collected status");

        if ctx.is_json() {
            let json = serde_json::json!({
                "sync_root": config.sync.root,
                "last_sync": last_sync.map(|t| t.to_rfc3339()),
                "logged_in": session.is_some(),
                "account": session.as_ref().map(|s| &s.account_id),
                "email": session.as_ref().and_then(|s| s.email.as_ref()),
                "settings": config.sync.settings,
                "backend": {
                    "url": config.backend.url,
                    "health": health.to_json(),
                },
                "usage": usage.to_json(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success("BlazeSync Status");
        formatter.info("");
        match &config.sync.root {
            Some(root) => formatter.info(&format!("Sync folder: {}", root.display())),
            None => formatter.info("Sync folder: not selected"),
        }
        formatter.info(&format!("Last sync:   {}", render_last_sync(last_sync)));
        match &session {
            Some(session) => formatter.info(&format!(
                "Account:     {}",
                session.email.as_deref().unwrap_or(&session.account_id)
            )),
            None => formatter.info("Account:     not logged in"),
        }
        formatter.info(&format!("Backend:     {} ({})", config.backend.url, health.render()));
        formatter.info(&format!("Storage:     {}", usage.render()));
        formatter.info("");
        formatter.info("Settings:");
        for line in render_settings(&config.sync.settings) {
            formatter.info(&line);
        }
        Ok(())
    }
}

async fn probe_backend(client: &BackendClient, session: Option<&StoredSession>) -> (Probe, Probe) {
    let health = match client.health().await {
        Ok(message) => Probe::Ok(message),
        Err(e) => Probe::Failed(e.to_string()),
    };

    let usage = match session {
        None => Probe::Skipped,
        Some(session) => match client.usage(&session.credentials()).await {
            Ok(raw) => Probe::Ok(render_usage(&raw)),
            Err(e) if e.is_unauthorized() => {
                Probe::Failed("session expired, run 'blazesync auth login'".to_string())
            }
            Err(e) => Probe::Failed(e.to_string()),
        },
    };
    debug!("Backend probed");
    (health, usage)
}

fn render_last_sync(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Never".to_string(),
    }
}

/// The backend reports bytes; anything else is shown verbatim
fn render_usage(raw: &str) -> String {
    match raw.trim().parse::<u64>() {
        Ok(bytes) => format!("{} used", format_bytes(bytes)),
        Err(_) => raw.trim().to_string(),
    }
}

fn render_settings(settings: &SyncSettings) -> Vec<String> {
    SyncSettings::KEYS
        .iter()
        .filter_map(|key| {
            settings.get(key).map(|enabled| {
                let note = if enabled && *key != "download_missing_files" {
                    " (not yet implemented)"
                } else {
                    ""
                };
                format!("  {:<26} {}{}", key, if enabled { "on" } else { "off" }, note)
            })
        })
        .collect()
}
