use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ghmirror::config::expand_local_path;
use ghmirror::summary::EXIT_INTERRUPTED;
use ghmirror::{Config, EntityKind, GitHubClient, GitHubDiscovery, SyncEngine};

/// Exit code for authentication, argument and setup errors
const EXIT_FATAL: i32 = 1;

#[derive(Parser)]
#[command(name = "ghmirror")]
#[command(about = "Mirror every GitHub repository of a user or organization to a local directory")]
#[command(version)]
struct Cli {
    /// GitHub personal access token
    token: String,

    /// User login or organization name
    name: String,

    /// Whose repositories to mirror
    #[arg(value_enum)]
    entity_type: EntityKind,

    /// Directory the repositories are mirrored into (created if missing)
    local_path: String,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the summary as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when any repository failed
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();

    let config = load_config(cli.config.as_deref())?;

    init_logging(cli.verbose, &config.logging.level)?;
    info!("Starting ghmirror v{}", env!("CARGO_PKG_VERSION"));

    let code = cmd_mirror(&cli, &config).await?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// Parse arguments; an unknown entity type is a setup error, not a usage error
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::InvalidValue => {
            let _ = e.print();
            std::process::exit(EXIT_FATAL);
        }
        Err(e) => e.exit(),
    }
}

/// Initialize logging; RUST_LOG overrides both flags and config
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let default_level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level: {}", default_level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

/// Mirror all repositories and print the report, returning the exit code
async fn cmd_mirror(cli: &Cli, config: &Config) -> Result<i32> {
    let local_path = expand_local_path(&cli.local_path)?;

    let client = GitHubClient::connect(&cli.token, config).await?;
    if !cli.json {
        println!("Authenticated as {}\n", client.username());
    }

    let discovery = GitHubDiscovery::new(client, cli.entity_type, &cli.name);
    let engine = SyncEngine::new(config)?.with_progress(!cli.json);

    let interrupted = engine.interrupt_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current repository (Ctrl+C again to abort)");
            interrupted.store(true, Ordering::SeqCst);

            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(EXIT_INTERRUPTED);
            }
        }
    });

    info!(
        "Mirroring {} repositories of {} into {}",
        cli.entity_type,
        cli.name,
        local_path.display()
    );

    let summary = engine.run(&discovery, &local_path).await?;

    if cli.json {
        println!("{}", summary.to_json()?);
    } else {
        println!();
        print!("{}", summary.render_text());
    }

    Ok(summary.exit_code(cli.strict || config.exit.fail_on_repo_error))
}
