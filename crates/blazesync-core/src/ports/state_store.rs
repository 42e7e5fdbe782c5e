//! Last-sync marker port
//!
//! The marker is the only durable state a pass writes. It is updated once
//! per completed pass and never on abort.

use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait ILastSyncStore: Send + Sync {
    /// When the last pass completed, if ever
    async fn last_sync(&self) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Record a completed pass
    async fn record_sync(&self, at: DateTime<Utc>) -> anyhow::Result<()>;
}
