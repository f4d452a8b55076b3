//! gridrl CLI - Tabular reinforcement learning on a gridworld
//!
//! This CLI provides:
//! - Training Monte Carlo, Q-learning, and SARSA agents
//! - Per-episode metrics export (CSV, JSONL) and a JSON run summary

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridrl")]
#[command(version, about = "Tabular reinforcement learning on a gridworld", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an agent on the gridworld
    Train(Box<gridrl::cli::commands::train::TrainArgs>),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "gridrl=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Train(args) => gridrl::cli::commands::train::execute(*args),
    }
}
