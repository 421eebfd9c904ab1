//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;
use viastudio_store::{SETTING_KEYS, SettingsStore, default_config_dir};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Print one setting.
    Get {
        /// Setting name.
        key: String,
    },

    /// Change one setting.
    Set {
        /// Setting name (see `config show`).
        key: String,
        /// New value.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli, store: &SettingsStore) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli, store).await,
        ConfigAction::Path => show_paths(cli, store),
        ConfigAction::Get { key } => get_value(key, cli, store).await,
        ConfigAction::Set { key, value } => set_value(key, value, cli, store).await,
        ConfigAction::Reset => reset_config(cli, store).await,
    }
}

async fn show_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_settings(&settings));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = store.path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn get_value(key: &str, cli: &Cli, store: &SettingsStore) -> Result<()> {
    let value = store.get().await.get_value(key)?;

    match cli.format {
        OutputFormat::Text => println!("{value}"),
        OutputFormat::Json => {
            let output = serde_json::json!({ "key": key, "value": value });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, cli: &Cli, store: &SettingsStore) -> Result<()> {
    if !SETTING_KEYS.contains(&key) {
        anyhow::bail!("Unknown setting: {key}. Known: {}", SETTING_KEYS.join(", "));
    }

    store.set_value(key, value).await?;
    store.save().await?;

    let stored = store.get().await.get_value(key)?;
    info!(key = %key, value = %stored, "Setting updated");

    if !cli.quiet {
        println!("{key} = {stored}");
    }

    Ok(())
}

async fn reset_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    store.reset().await;
    store.save().await?;
    info!(path = %store.path().display(), "Settings reset");

    if !cli.quiet {
        println!("Configuration reset to defaults");
    }

    Ok(())
}
