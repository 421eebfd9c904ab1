// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! VIA Studio CLI - AI video generation from the terminal.
//!
//! # Examples
//!
//! ```bash
//! # Generate a clip with the saved defaults
//! viastudio generate "a red fox running through fresh snow"
//!
//! # Portrait, 1080p, saved to disk
//! viastudio generate "neon city at night" --ratio 9:16 --resolution 1080p -o city.mp4
//!
//! # Interactive session with history
//! viastudio studio
//!
//! # Select or inspect the API key
//! viastudio auth select
//! viastudio auth status --format json
//!
//! # Change a default
//! viastudio config set style anime
//! ```

mod commands;
mod output;
mod prompt;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use viastudio_store::{LogLevel, SettingsStore};

use commands::{auth, config, generate, studio};
use session::CredentialRequired;

// ============================================================================
// CLI Definition
// ============================================================================

/// VIA Studio CLI - AI video generation.
#[derive(Parser)]
#[command(name = "viastudio")]
#[command(about = "Generate short videos from text prompts")]
#[command(long_about = r#"
VIA Studio turns text prompts into short video clips using Google's Veo
models through the Gemini API.

The API key is read from GEMINI_API_KEY or API_KEY, then from the system
keychain. Run `viastudio auth select` to store one.

Examples:
  viastudio generate "a lighthouse in a storm"     # One clip
  viastudio generate "..." --style anime -o out.mp4
  viastudio studio                                 # Interactive session
  viastudio config show                            # Current defaults
"#)]
#[command(version)]
#[command(author = "VIA Studio Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, starts the interactive studio.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Use this API key for the session instead of the environment or keychain.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Returns true if text output may use ANSI colors.
    pub fn use_colors(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none()
    }

    /// Returns true if progress should be written to stderr.
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Generate one video and wait for it.
    #[command(visible_alias = "g")]
    Generate(generate::GenerateArgs),

    /// Interactive session with history (default if no command specified).
    #[command(visible_alias = "s")]
    Studio,

    /// Manage the API key.
    Auth(auth::AuthArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No usable API key; run `viastudio auth select`.
    CredentialRequired = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("viastudio=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("viastudio={level}")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = SettingsStore::load_default().await?;
    let level = store.get().await.log_level;
    setup_logging(cli.verbose, cli.quiet, level);

    let result = match &cli.command {
        Some(Commands::Generate(args)) => generate::run(args, &cli, &store).await,
        Some(Commands::Studio) | None => studio::run(&cli, &store).await,
        Some(Commands::Auth(args)) => auth::run(args, &cli, &store).await,
        Some(Commands::Config(args)) => config::run(args, &cli, &store).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        let code = if e.is::<CredentialRequired>() {
            ExitCode::CredentialRequired
        } else {
            ExitCode::Error
        };
        std::process::exit(code as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "viastudio", "generate", "a fox", "--ratio", "9:16", "--tag", "4k", "--tag",
            "cinematic", "-o", "fox.mp4", "--format", "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.prompt, "a fox");
        assert_eq!(args.ratio, Some(viastudio_core::AspectRatio::Tall));
        assert_eq!(args.tags.len(), 2);
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("fox.mp4")));
    }

    #[test]
    fn test_parse_rejects_bad_ratio() {
        assert!(Cli::try_parse_from(["viastudio", "generate", "x", "--ratio", "4:3"]).is_err());
    }

    #[test]
    fn test_no_command_is_studio() {
        let cli = Cli::try_parse_from(["viastudio", "--api-key", "abc"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["viastudio", "config", "show", "--pretty", "-q"]).unwrap();
        assert!(cli.pretty);
        assert!(cli.quiet);
        assert!(!cli.show_progress());
    }
}
