use anyhow::Result;
use clap::{Parser, Subcommand};
use octostrap_cli::commands::gate::{GateCommands, handle_gate_command};
use octostrap_cli::commands::releases::{ReleaseCommands, handle_release_command};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(
    name = "octostrap",
    version,
    about = "First-run bootstrap gate for the print-server companion"
)]
struct Cli {
    /// Path to octostrap.toml
    #[clap(short, long, global = true, default_value = "octostrap.toml")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap gate evaluation
    #[clap(subcommand)]
    Gate(GateCommands),

    /// Bootstrap release listing
    #[clap(subcommand)]
    Releases(ReleaseCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Gate(cmd) => handle_gate_command(cmd, &cli.config).await,
        Commands::Releases(cmd) => handle_release_command(cmd, &cli.config).await,
    }
}
