//! Release listing command

use crate::config::GateConfig;
use crate::releases::{GithubReleaseSource, ReleaseSource, ReleaseTracker};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

#[derive(Debug, Parser, Clone)]
pub enum ReleaseCommands {
    /// Fetch and print the available bootstrap releases
    List {
        /// Print the release list as JSON
        #[clap(long)]
        json: bool,
    },
}

pub async fn handle_release_command(cmd: ReleaseCommands, config_path: &Path) -> Result<()> {
    let path = crate::config::locate_config(config_path)?;
    let config = GateConfig::load(&path)?;

    match cmd {
        ReleaseCommands::List { json } => list_releases(&config, json).await,
    }
}

async fn list_releases(config: &GateConfig, json: bool) -> Result<()> {
    let source = GithubReleaseSource::new(&config.releases.repo, &config.releases.api_base);
    let releases = source.fetch_releases().await?;

    let mut tracker = ReleaseTracker::new();
    tracker.update(releases);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(tracker.releases())
                .context("Failed to serialize release list")?
        );
        return Ok(());
    }

    if tracker.releases().is_empty() {
        println!("No releases published for {}", config.releases.repo);
        return Ok(());
    }

    println!("📦 Bootstrap releases ({}):", config.releases.repo);
    for label in tracker.display_labels() {
        println!("  {label}");
    }

    Ok(())
}
