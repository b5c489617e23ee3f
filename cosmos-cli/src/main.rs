//! Cosmos CLI - Command line interface for Cosmos
//!
//! Assemble AI agent squads, huddle with them and build mission documents
//! from the terminal.

mod commands;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cosmos_core::config::StorageBackend;
use cosmos_core::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    AgentsArgs, CommunityArgs, DocArgs, HuddleArgs, MissionArgs, OracleArgs, ProfileArgs,
    SecretsArgs,
};
use session::Session;

/// Cosmos: AI agent squads for your missions
#[derive(Parser, Debug)]
#[command(name = "cosmos")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Text model to use (overrides config and env)
    #[arg(long, global = true, env = "COSMOS_MODEL")]
    model: Option<String>,

    /// Database file (overrides config and env)
    #[arg(long, global = true, env = "COSMOS_DB_PATH")]
    db: Option<PathBuf>,

    /// Keep all data in memory for this run only
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Show current configuration
    Config,

    /// Manage the secrets file
    Secrets(SecretsArgs),

    /// Manage your profile
    Profile(ProfileArgs),

    /// Browse agents, presets and your roster
    #[command(visible_alias = "a")]
    Agents(AgentsArgs),

    /// Create and manage missions
    #[command(visible_alias = "m")]
    Mission(MissionArgs),

    /// Ask the active mission's squad a question
    #[command(visible_alias = "h")]
    Huddle(HuddleArgs),

    /// View and edit the active mission document
    Doc(DocArgs),

    /// Community feed, hubs, messages and the leaderboard
    #[command(visible_alias = "c")]
    Community(CommunityArgs),

    /// Strategic insights across your missions
    Oracle(OracleArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.model.clone(), cli.db.clone(), cli.memory)?;

    if cli.verbose {
        tracing::info!(
            text_model = %config.model.text_model,
            image_model = %config.model.image_model,
            backend = ?config.storage.backend,
            "Configuration loaded"
        );
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, cancelling");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Some(Commands::Version) => {
            println!("cosmos {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Config) => print_config(&config)?,
        Some(Commands::Secrets(args)) => {
            args.execute()?;
        }
        Some(Commands::Profile(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        Some(Commands::Agents(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        Some(Commands::Mission(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        Some(Commands::Huddle(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        Some(Commands::Doc(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        Some(Commands::Community(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        Some(Commands::Oracle(args)) => {
            let session = Session::open(config, cancel, cli.verbose).await?;
            args.execute(&session).await?;
        }
        None => {
            println!("Cosmos - AI agent squads for your missions");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) -> anyhow::Result<()> {
    println!("Cosmos Configuration");
    println!("====================");
    println!();
    println!("Model Settings:");
    println!("  text_model: {}", config.model.text_model);
    println!("  image_model: {}", config.model.image_model);
    println!("  base_url: {}", config.model.base_url);
    println!("  request_timeout: {:?}", config.model.request_timeout);
    println!("  stream_idle_timeout: {:?}", config.model.stream_idle_timeout);
    println!();
    println!("Storage Settings:");
    match config.storage.backend {
        StorageBackend::Memory => println!("  backend: memory (nothing is saved)"),
        StorageBackend::Sqlite => {
            println!("  backend: sqlite");
            println!("  path: {}", config.storage.resolved_path()?.display());
        }
    }
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
    Ok(())
}
