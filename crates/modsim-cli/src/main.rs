//! Modsim CLI - run and inspect logic circuits from bench files.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use modsim_config::SimConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modsim")]
#[command(author, version, about = "Modsim logic simulator CLI", long_about = None)]
struct Cli {
    /// Simulator settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a bench, clocked or free-running
    Run(commands::run::RunArgs),

    /// Build a bench and report what it contains
    Check(commands::check::CheckArgs),

    /// List module types and their ports
    Modules(commands::modules::ModulesArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &config),
        Commands::Check(args) => commands::check::run(args, &config),
        Commands::Modules(args) => commands::modules::run(args),
    }
}
