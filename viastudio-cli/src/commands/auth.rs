//! Auth command - select, inspect or clear the API key.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use viastudio_fetch::{CredentialCapability, CredentialGate, StaticCredentials};
use viastudio_store::SettingsStore;

use crate::output::{AuthOutput, JsonFormatter, TextFormatter};
use crate::session::{CredentialRequired, keychain_credentials};
use crate::{Cli, OutputFormat};

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Auth subcommands.
#[derive(Subcommand)]
pub enum AuthAction {
    /// Show whether a key is available and where it comes from.
    Status,

    /// Choose a key and store it in the system keychain.
    Select,

    /// Remove the stored key from the keychain.
    Clear,
}

/// Runs the auth command.
pub async fn run(args: &AuthArgs, cli: &Cli, store: &SettingsStore) -> Result<()> {
    match &args.action {
        AuthAction::Status => status(cli).await,
        AuthAction::Select => select(cli, store).await,
        AuthAction::Clear => clear(cli).await,
    }
}

async fn status(cli: &Cli) -> Result<()> {
    let (gate, source) = match keychain_credentials(cli) {
        Some(keychain) => {
            let source = keychain.source().await.unwrap_or(None);
            (CredentialGate::new(keychain), source)
        }
        None => {
            let capability: Arc<dyn CredentialCapability> = Arc::new(
                StaticCredentials::new(cli.api_key.as_deref().unwrap_or_default()),
            );
            (CredentialGate::new(capability), Some("--api-key".to_string()))
        }
    };
    gate.refresh().await;
    let state = gate.state();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_gate(state, source.as_deref()));
        }
        OutputFormat::Json => {
            let output = AuthOutput::new(state, source);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    if state.is_usable() {
        Ok(())
    } else {
        Err(CredentialRequired::missing().into())
    }
}

async fn select(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let Some(keychain) = keychain_credentials(cli) else {
        bail!("--api-key is set; nothing to select");
    };
    let strict = store.get().await.strict_credentials;
    let gate = CredentialGate::new(keychain.clone()).strict(strict);

    let state = gate.request_selection().await;
    let source = keychain.source().await.unwrap_or(None);

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_gate(state, source.as_deref()));
        }
        OutputFormat::Json => {
            let output = AuthOutput::new(state, source);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    if state.is_usable() {
        Ok(())
    } else {
        Err(CredentialRequired::missing().into())
    }
}

async fn clear(cli: &Cli) -> Result<()> {
    let Some(keychain) = keychain_credentials(cli) else {
        bail!("--api-key is set; nothing stored to clear");
    };
    keychain.clear().await?;

    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("API key removed from the keychain.");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({ "cleared": true });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}
