//! MirrorLink CLI — command-line interface for demos and diagnostics.
//!
//! Usage:
//!   mirrorlink demo            Run a scripted hotplug scenario
//!   mirrorlink modes <MODES>   Rank display modes by capability
//!   mirrorlink check           Show effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mirrorlink",
    about = "USB display adapter detection and screen mirroring engine",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted plug-and-mirror scenario on the simulated platform
    Demo {
        /// Override the configured settle delay after adapter attach (milliseconds)
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Override the configured poll interval while waiting for an output (milliseconds)
        #[arg(long)]
        poll_ms: Option<u64>,

        /// Answer the capture consent prompt with a denial
        #[arg(long)]
        deny_consent: bool,
    },

    /// Rank display modes by capability
    Modes {
        /// Modes as WIDTHxHEIGHT[@HZ], e.g. 1920x1080@60
        #[arg(required = true)]
        modes: Vec<String>,
    },

    /// Show effective configuration and stored settings
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    mirrorlink_common::logging::init_logging(&mirrorlink_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Demo {
            settle_ms,
            poll_ms,
            deny_consent,
        } => commands::demo::run(settle_ms, poll_ms, deny_consent).await,
        Commands::Modes { modes } => commands::modes::run(modes),
        Commands::Check => commands::check::run(),
    }
}
