//! Sync command - Download missing files from BlazedCloud
//!
//! Provides the `blazesync sync` CLI command which:
//! 1. Loads configuration and wires the backend, state file and transfer engine
//! 2. Runs one pass: inventories, reconciliation, confirmation, downloads
//! 3. Shows per-file progress bars and a summary
//!
//! Ctrl-C cancels the pass; finished files stay, partial ones are removed.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use blazesync_api::provider::BackendInventoryProvider;
use blazesync_core::config::Config;
use blazesync_core::domain::{format_bytes, SyncKey, UnsyncedReason};
use blazesync_core::ports::{
    FixedConfirmation, IPassConfirmation, ITransferObserver, TransferPreview,
};
use blazesync_sync::engine::{
    PassOutcome, PassPreview, PassSummary, SkipReason, SyncOrchestrator, SyncRequest,
};
use blazesync_sync::state::JsonStateStore;
use blazesync_sync::transfer::TransferEngine;
use blazesync_sync::SyncError;
use clap::Args;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::{backend, CommandContext};
use crate::output::{plural, table, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Start downloads without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be downloaded without transferring anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        info!(config_path = %ctx.config_path.display(), "Loaded configuration");

        let progress = (!ctx.is_json() && !ctx.quiet).then(|| Arc::new(ProgressObserver::new()));
        let orchestrator = build_orchestrator(&config, progress)?;

        let cancel = orchestrator.cancellation_token();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling sync pass");
                cancel.cancel();
            }
        });

        let result = if self.dry_run {
            self.run_preview(ctx, &*formatter, &orchestrator, &config).await
        } else {
            self.run_pass(ctx, &*formatter, &orchestrator, &config).await
        };
        ctrl_c.abort();
        result
    }

    async fn run_preview(
        &self,
        ctx: &CommandContext,
        formatter: &dyn OutputFormatter,
        orchestrator: &SyncOrchestrator,
        config: &Config,
    ) -> Result<()> {
        let Some(root) = config.sync.root.as_deref() else {
            formatter.error(NO_FOLDER_HINT);
            return Ok(());
        };

        let preview = orchestrator
            .preview(root, &config.sync.settings)
            .await
            .map_err(|e| explain(formatter, e))?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&preview)?);
            return Ok(());
        }

        formatter.success(&format!("Dry run for {}", root.display()));
        print_counts(formatter, &preview.preview);
        print_plan(formatter, &preview);
        for issue in &preview.reconciliation.issues {
            formatter.warn(&issue.to_string());
        }
        for rejected in &preview.rejected {
            formatter.warn(&format!(
                "Listing record #{} rejected: {}",
                rejected.index, rejected.reason
            ));
        }
        for issue in &preview.local_issues {
            formatter.warn(issue);
        }
        formatter.info("No files were transferred.");
        Ok(())
    }

    async fn run_pass(
        &self,
        ctx: &CommandContext,
        formatter: &dyn OutputFormatter,
        orchestrator: &SyncOrchestrator,
        config: &Config,
    ) -> Result<()> {
        let request = SyncRequest {
            sync_root: config.sync.root.clone(),
            settings: config.sync.settings,
        };

        let confirmation: Box<dyn IPassConfirmation> = if self.yes {
            Box::new(FixedConfirmation(true))
        } else {
            Box::new(PromptConfirmation { json: ctx.is_json() })
        };

        if !ctx.is_json() {
            formatter.info("Fetching remote and local inventories...");
        }

        let outcome = orchestrator
            .run_sync(request, confirmation.as_ref())
            .await
            .map_err(|e| explain(formatter, e))?;

        match outcome {
            PassOutcome::Skipped(SkipReason::NoSyncRoot) => formatter.error(NO_FOLDER_HINT),
            PassOutcome::Skipped(SkipReason::AlreadyRunning) => {
                formatter.warn("A sync pass is already running")
            }
            PassOutcome::Completed(summary) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::to_value(&summary)?);
                } else {
                    print_summary(formatter, &summary);
                }
            }
        }
        Ok(())
    }
}

const NO_FOLDER_HINT: &str =
    "No sync folder selected. Run 'blazesync config set-folder <path>' first.";

fn build_orchestrator(
    config: &Config,
    progress: Option<Arc<ProgressObserver>>,
) -> Result<SyncOrchestrator> {
    let (client, auth) = backend(config)?;
    let inventory = BackendInventoryProvider::new(client);
    let store = JsonStateStore::in_dir(&Config::default_data_dir());

    let mut transfer = TransferEngine::new(&config.transfer, &config.backend)
        .context("Failed to create transfer engine")?;
    if let Some(observer) = progress {
        transfer = transfer.with_observer(observer);
    }

    Ok(SyncOrchestrator::new(
        Arc::new(auth),
        Arc::new(inventory),
        Arc::new(store),
        Arc::new(transfer),
        config.transfer.max_concurrent_downloads,
    ))
}

/// Prints a hint for the pass-level errors a user can act on
fn explain(formatter: &dyn OutputFormatter, err: SyncError) -> anyhow::Error {
    match &err {
        SyncError::AuthUnavailable(_) => {
            formatter.error("Not logged in. Run 'blazesync auth login' first.")
        }
        SyncError::Cancelled => formatter.warn("Sync cancelled"),
        _ => {}
    }
    anyhow::Error::new(err).context("Sync pass failed")
}

// ============================================================================
// Rendering
// ============================================================================

/// Local files that are either absent remotely or newer than the server copy
const UNSYNCED_LABEL: &str = "Not uploaded or newer locally";

fn preview_rows(preview: &TransferPreview) -> Vec<Vec<String>> {
    vec![
        vec![
            "Missing locally".into(),
            preview.missing_count.to_string(),
            format_bytes(preview.missing_bytes),
        ],
        vec![
            UNSYNCED_LABEL.into(),
            preview.unsynced_count.to_string(),
            format_bytes(preview.unsynced_bytes),
        ],
        vec![
            "Up to date".into(),
            preview.up_to_date_count.to_string(),
            String::new(),
        ],
    ]
}

fn print_counts(formatter: &dyn OutputFormatter, preview: &TransferPreview) {
    formatter.info("");
    for line in table(&["", "Files", "Size"], &preview_rows(preview)) {
        formatter.info(&line);
    }
    formatter.info("");
    if preview.issue_count > 0 {
        formatter.warn(&format!(
            "{} object{} could not be compared",
            preview.issue_count,
            plural(preview.issue_count)
        ));
    }
    if preview.rejected_count > 0 {
        formatter.warn(&format!(
            "{} listing record{} rejected",
            preview.rejected_count,
            plural(preview.rejected_count)
        ));
    }
    if !preview.downloads_enabled {
        formatter.warn("Downloading missing files is disabled in the settings");
    }
}

fn print_plan(formatter: &dyn OutputFormatter, preview: &PassPreview) {
    let missing = &preview.reconciliation.missing;
    if missing.is_empty() {
        return;
    }
    let rows: Vec<Vec<String>> = missing
        .iter()
        .map(|object| {
            vec![
                object.key.to_string(),
                format_bytes(object.reported_size()),
                object.last_modified.clone(),
            ]
        })
        .collect();
    formatter.info("Would download:");
    for line in table(&["File", "Size", "Modified"], &rows) {
        formatter.info(&line);
    }
    formatter.info("");

    let unsynced: Vec<Vec<String>> = preview
        .reconciliation
        .unsynced
        .iter()
        .map(|file| {
            let reason = match file.reason {
                UnsyncedReason::NotOnServer => "not on server",
                UnsyncedReason::ServerOutdated => "newer locally",
            };
            vec![file.key.to_string(), format_bytes(file.size), reason.to_string()]
        })
        .collect();
    if !unsynced.is_empty() {
        formatter.info(&format!("{UNSYNCED_LABEL} (left untouched):"));
        for line in table(&["File", "Size", "Reason"], &unsynced) {
            formatter.info(&line);
        }
        formatter.info("");
    }
}

fn print_summary(formatter: &dyn OutputFormatter, summary: &PassSummary) {
    let duration = if summary.duration_ms >= 1000 {
        format!("{:.1}s", summary.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", summary.duration_ms)
    };

    if summary.preview.missing_count == 0 && summary.failures.is_empty() {
        formatter.success("Already up to date");
    } else if !summary.confirmed {
        formatter.warn("Transfers not confirmed; nothing was downloaded");
    } else {
        formatter.success(&format!("Sync completed in {}", duration));
    }

    if summary.downloaded > 0 {
        formatter.info(&format!(
            "Downloaded: {} file{} ({})",
            summary.downloaded,
            plural(summary.downloaded),
            format_bytes(summary.bytes_downloaded)
        ));
    }
    if summary.preview.unsynced_count > 0 {
        formatter.info(&format!(
            "{}: {} file{} ({})",
            UNSYNCED_LABEL,
            summary.preview.unsynced_count,
            plural(summary.preview.unsynced_count),
            format_bytes(summary.preview.unsynced_bytes)
        ));
    }
    if summary.removed_temp_files > 0 {
        formatter.info(&format!(
            "Removed {} leftover partial download{}",
            summary.removed_temp_files,
            plural(summary.removed_temp_files)
        ));
    }

    if !summary.failures.is_empty() {
        formatter.error(&format!(
            "{} download{} failed:",
            summary.failures.len(),
            plural(summary.failures.len())
        ));
        for failure in &summary.failures {
            formatter.info(&format!("  - {}: {}", failure.key, failure.error));
        }
    }
    for issue in &summary.issues {
        formatter.warn(&issue.to_string());
    }
    for rejected in &summary.rejected {
        formatter.warn(&format!(
            "Listing record #{} rejected: {}",
            rejected.index, rejected.reason
        ));
    }
    for issue in &summary.local_issues {
        formatter.warn(issue);
    }
    for note in &summary.notes {
        formatter.info(note);
    }
}

// ============================================================================
// Confirmation prompt
// ============================================================================

/// Shows the preview table and asks before transferring
struct PromptConfirmation {
    json: bool,
}

#[async_trait::async_trait]
impl IPassConfirmation for PromptConfirmation {
    async fn confirm(&self, preview: &TransferPreview) -> Result<bool> {
        if self.json {
            anyhow::bail!("Confirmation requires an interactive terminal; pass --yes with --json");
        }

        for line in table(&["", "Files", "Size"], &preview_rows(preview)) {
            println!("  {line}");
        }
        println!();

        if !std::io::stdin().is_terminal() {
            anyhow::bail!("stdin is not a terminal; pass --yes to sync non-interactively");
        }

        let prompt = if preview.downloads_enabled && preview.missing_count > 0 {
            format!(
                "Download {} file{} ({})?",
                preview.missing_count,
                plural(preview.missing_count),
                format_bytes(preview.missing_bytes)
            )
        } else {
            "Continue?".to_string()
        };

        tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(true)
                .interact()
        })
        .await
        .context("Confirmation prompt task failed")?
        .context("Failed to read confirmation")
    }
}

// ============================================================================
// Progress bars
// ============================================================================

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg:40!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg:40!} {bytes} ({bytes_per_sec})";

/// One bar per active download
struct ProgressObserver {
    multi: MultiProgress,
    bars: Mutex<HashMap<SyncKey, ProgressBar>>,
}

impl ProgressObserver {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn take(&self, key: &SyncKey) -> Option<ProgressBar> {
        self.bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key)
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ITransferObserver for ProgressObserver {
    fn started(&self, key: &SyncKey, total: Option<u64>) {
        let bar = match total {
            Some(len) => self
                .multi
                .add(ProgressBar::new(len))
                .with_style(style(BAR_TEMPLATE)),
            None => self
                .multi
                .add(ProgressBar::new_spinner())
                .with_style(style(SPINNER_TEMPLATE)),
        };
        bar.set_message(key.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        self.bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.clone(), bar);
    }

    fn advanced(&self, key: &SyncKey, bytes: u64) {
        if let Some(bar) = self
            .bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
        {
            bar.inc(bytes);
        }
    }

    fn finished(&self, key: &SyncKey) {
        if let Some(bar) = self.take(key) {
            bar.finish_and_clear();
        }
        let _ = self.multi.println(format!("\u{2713} {key}"));
    }

    fn failed(&self, key: &SyncKey, reason: &str) {
        if let Some(bar) = self.take(key) {
            bar.abandon();
            self.multi.remove(&bar);
        }
        let _ = self.multi.println(format!("\u{2717} {key}: {reason}"));
    }
}
