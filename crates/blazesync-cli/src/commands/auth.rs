//! Auth commands - Login, Logout, and Status for BlazedCloud
//!
//! 1. `login`  - Exchanges email and password for a token and stores the
//!    session in the system keyring.
//! 2. `logout` - Removes the stored session.
//! 3. `status` - Checks the stored session against the backend.

use anyhow::{Context, Result};
use blazesync_core::ports::IAuthProvider;
use clap::Subcommand;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use tracing::info;

use super::{backend, CommandContext};
use crate::output::OutputFormatter;

/// Environment variable read instead of prompting for the password
pub const PASSWORD_ENV: &str = "BLAZESYNC_PASSWORD";

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in with email and password
    Login {
        /// Account email (prompted for when omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let fmt = ctx.formatter();
        match self {
            AuthCommand::Login { email } => execute_login(ctx, email.clone(), &*fmt).await,
            AuthCommand::Logout => execute_logout(ctx, &*fmt),
            AuthCommand::Status => execute_status(ctx, &*fmt).await,
        }
    }
}

async fn execute_login(
    ctx: &CommandContext,
    email: Option<String>,
    fmt: &dyn OutputFormatter,
) -> Result<()> {
    let config = ctx.load_config();
    let (_, auth) = backend(&config)?;

    let email = match email {
        Some(email) => email,
        None => tokio::task::spawn_blocking(|| {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("Email")
                .interact_text()
        })
        .await
        .context("Email prompt task failed")?
        .context("Failed to read email")?,
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => tokio::task::spawn_blocking(|| {
            Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Password")
                .interact()
        })
        .await
        .context("Password prompt task failed")?
        .context("Failed to read password")?,
    };

    info!(email = %email, "Logging in");
    let session = auth.login(email.trim(), &password).await?;

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "account": session.account_id,
            "email": session.email,
        }));
    } else {
        fmt.success(&format!(
            "Logged in as {}",
            session.email.as_deref().unwrap_or(&session.account_id)
        ));
        if config.sync.root.is_none() {
            fmt.info("Next: choose a folder with 'blazesync config set-folder <path>'");
        }
    }
    Ok(())
}

fn execute_logout(ctx: &CommandContext, fmt: &dyn OutputFormatter) -> Result<()> {
    let config = ctx.load_config();
    let (_, auth) = backend(&config)?;

    let had_session = auth.current_session()?.is_some();
    auth.logout().context("Failed to clear stored session")?;

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({ "success": true, "was_logged_in": had_session }));
    } else if had_session {
        fmt.success("Logged out");
    } else {
        fmt.info("Not logged in. Nothing to log out.");
    }
    Ok(())
}

async fn execute_status(ctx: &CommandContext, fmt: &dyn OutputFormatter) -> Result<()> {
    let config = ctx.load_config();
    let (_, auth) = backend(&config)?;

    let email = auth.current_session()?.and_then(|s| s.email);
    // Refreshing also clears a session the backend refuses
    let credentials = auth.get_auth().await?;

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "authenticated": credentials.is_some(),
            "account": credentials.as_ref().map(|c| &c.account_id),
            "email": email,
        }));
        return Ok(());
    }

    match credentials {
        Some(credentials) => {
            fmt.success(&format!(
                "Authenticated as {}",
                email.as_deref().unwrap_or(&credentials.account_id)
            ));
            fmt.info(&format!("Account id: {}", credentials.account_id));
        }
        None => fmt.warn("Not logged in. Run 'blazesync auth login'."),
    }
    Ok(())
}
