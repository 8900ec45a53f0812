//! Quorum CLI
//!
//! Operator tooling for the Quorum vault.

use anyhow::Result;
use clap::{Parser, Subcommand};
use quorum_cli::commands::{handle_check, handle_run};
use quorum_core::Address;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Quorum - Multi-party vault authorization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a vault configuration and print a summary
    Check {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay a JSON-lines script against a fresh vault
    Run {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Script file (JSON lines)
        #[arg(short, long)]
        script: PathBuf,

        /// Make calls to this target revert (repeatable)
        #[arg(long, value_name = "ADDRESS")]
        revert: Vec<Address>,

        /// Stop at the first rejected command
        #[arg(long)]
        fail_fast: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Check { config } => handle_check(config),
        Commands::Run {
            config,
            script,
            revert,
            fail_fast,
        } => handle_run(config, script, revert, *fail_fast),
    }
}
