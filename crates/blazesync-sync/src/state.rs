//! Last-sync marker persisted as a small JSON document
//!
//! ```json
//! { "last_sync": "2024-05-01T12:00:00.123456Z" }
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use blazesync_core::ports::ILastSyncStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name of the marker inside the data directory
pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    /// RFC 3339, UTC
    last_sync: Option<String>,
}

/// [`ILastSyncStore`] backed by `<data_dir>/state.json`
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/state.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> anyhow::Result<StateDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse {}", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StateDocument::default()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        }
    }
}

#[async_trait::async_trait]
impl ILastSyncStore for JsonStateStore {
    async fn last_sync(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let document = self.read_document().await?;
        document
            .last_sync
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .with_context(|| format!("Invalid last_sync value {raw:?}"))
            })
            .transpose()
    }

    async fn record_sync(&self, at: DateTime<Utc>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create state directory")?;
        }

        let document = StateDocument {
            last_sync: Some(at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
        };
        let json = serde_json::to_vec_pretty(&document).context("Failed to encode state")?;

        let tmp_path = {
            let mut p = self.path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };
        tokio::fs::write(&tmp_path, json)
            .await
            .context("Failed to write state file")?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .context("Failed to replace state file")?;

        debug!(path = %self.path.display(), %at, "last sync recorded");
        Ok(())
    }
}
