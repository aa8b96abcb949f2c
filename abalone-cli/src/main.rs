//! Abalone CLI - Command-line interface
//!
//! Commands:
//! - search: Analyse one position
//! - play: Engine-vs-engine game with time limits and pondering
//! - layouts: Show the built-in starting layouts

mod layouts_cmd;
mod play_cmd;
mod search_cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use abalone_core::EngineConfig;

#[derive(Parser)]
#[command(name = "abalone")]
#[command(about = "Abalone search engine")]
struct Cli {
    /// Engine configuration JSON file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Random seed for fallback moves (None = random)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one position and report the best move
    Search(search_cmd::SearchArgs),
    /// Play a full engine-vs-engine game
    Play(play_cmd::PlayArgs),
    /// Print the built-in layouts
    Layouts(layouts_cmd::LayoutsArgs),
}

fn main() -> Result<()> {
    // Initialize logging (RUST_LOG, default info), kept off stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Search(args) => search_cmd::run(args, config),
        Commands::Play(args) => play_cmd::run(args, config, cli.seed),
        Commands::Layouts(args) => layouts_cmd::run(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}
