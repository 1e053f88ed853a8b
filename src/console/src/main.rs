//! memberhub console - main binary
//!
//! Runs the session lifecycle against a backend fixture:
//! - `status`: initialize, resolve the role, list visible sections
//! - `check <section>`: access decision for one section
//! - `replay <events.json>`: feed auth-state notifications through the store
//! - `sign-out`: user-initiated sign-out

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use memberhub_console::{load_events, BackendFixture, Console, ConsoleConfig};

/// memberhub console CLI
#[derive(Parser)]
#[command(name = "memberhub-console")]
#[command(about = "memberhub session and role console")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "memberhub.toml", env = "MEMBERHUB_CONFIG")]
    config: PathBuf,

    /// Backend fixture (overrides config)
    #[arg(long, env = "MEMBERHUB_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Show the signed-in user, role and visible sections
    Status,

    /// Check access to a console section
    Check {
        /// Section id (dashboard, users, collectors, audit, settings)
        section: String,
    },

    /// Replay a JSON array of auth-state notifications
    Replay {
        /// Path to the events file
        events: PathBuf,
    },

    /// Sign the current user out
    SignOut,

    /// Show console version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("memberhub console v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = ConsoleConfig::load(&cli.config)?;

    // Initialize logging
    let log_level = if cli.verbose { "debug".to_string() } else { config.console.log_level.clone() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into())
        )
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Loaded configuration from {:?}", cli.config);
    config.validate()?;

    let base = cli.config.parent().unwrap_or_else(|| Path::new("."));
    let fixture_path = cli.fixture.unwrap_or_else(|| config.fixture_path(base));
    let fixture = BackendFixture::load(&fixture_path)?;
    info!("Loaded backend fixture from {:?}", fixture_path);

    let console = Console::new(&config, &fixture);

    match cli.command {
        Command::Status => print_json(&console.status().await)?,
        Command::Check { section } => print_json(&console.check(&section).await)?,
        Command::Replay { events } => {
            let changes = load_events(&events)?;
            info!(count = changes.len(), "Replaying notifications");
            print_json(&console.replay(changes).await)?;
        }
        Command::SignOut => print_json(&console.sign_out().await?)?,
        Command::Version => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to render report")?;
    println!("{}", json);
    Ok(())
}
