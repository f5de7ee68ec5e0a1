//! Gate commands - first-run bootstrap decision
//!
//! `gate run` evaluates the full state machine and hands off; `gate check`
//! probes every gate input read-only and prints a report.

use crate::config::{GateConfig, Preferences};
use crate::gate::{
    BootstrapGate, GateOutcome, InstallationLayout, InstallationLayoutProbe, InstallationState,
    MarkerLayoutProbe, Operator, ParkReason, PrivilegedClear, ReleaseFetchTrigger, ShellClear,
    WipeDecision,
};
use crate::probes::{CapabilityProbe, DeviceProbe};
use crate::releases::{self, GithubReleaseSource, Release, ReleaseSource, ReleaseTracker};
use crate::repo::{BootstrapRepository, ProotBootstrapRepository};
use crate::report::{GateReport, print_gate_report};
use crate::service::{BackgroundService, ServiceSupervisor};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Parser, Clone)]
pub enum GateCommands {
    /// Evaluate the bootstrap gate and hand off to install or main flow
    Run {
        /// Confirm destructive wipes without prompting
        #[clap(short, long)]
        yes: bool,

        /// Do not start the background print service
        #[clap(long)]
        skip_service: bool,

        /// Treat the network as absent (dry-run of the offline path)
        #[clap(long)]
        offline: bool,
    },

    /// Probe all gate inputs read-only and print a report
    Check {
        /// Also fetch the release list
        #[clap(long)]
        releases: bool,

        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },
}

/// Handle gate commands
pub async fn handle_gate_command(cmd: GateCommands, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    match cmd {
        GateCommands::Run {
            yes,
            skip_service,
            offline,
        } => run_gate(&config, yes, skip_service, offline).await,
        GateCommands::Check { releases, json } => check_gate(&config, releases, json).await,
    }
}

fn load_config(config_path: &Path) -> Result<GateConfig> {
    let path = crate::config::locate_config(config_path)?;
    GateConfig::load(&path)
}

fn preferences_path(config: &GateConfig) -> PathBuf {
    config.data_root().join("preferences.toml")
}

/// Apply the first-run release default. A failed save only logs: the
/// data root may not be accessible yet, and the gate handles that itself.
fn ensure_release_preference(config: &GateConfig) -> Result<Preferences> {
    let path = preferences_path(config);
    let mut prefs = Preferences::load(&path).unwrap_or_default();

    if prefs.ensure_release_default() {
        if let Err(err) = prefs.save(&path) {
            tracing::warn!("could not persist release preference: {:#}", err);
        }
    }

    Ok(prefs)
}

fn device_probe(config: &GateConfig) -> DeviceProbe {
    DeviceProbe::new(
        config.data_root(),
        crate::config::expand_path(&config.probes.video_dir),
        config.probes.network_endpoint.clone(),
        Duration::from_millis(config.probes.timeout_ms),
    )
}

/// Device probe with the network forced absent
struct OfflineProbe {
    inner: DeviceProbe,
}

impl CapabilityProbe for OfflineProbe {
    fn enumerate_cameras(&self) {
        self.inner.enumerate_cameras();
    }

    fn has_storage_access(&self) -> bool {
        self.inner.has_storage_access()
    }

    fn network_connected(&self) -> bool {
        false
    }
}

/// Service stand-in for --skip-service
struct NullService;

impl BackgroundService for NullService {
    fn ensure_running(&self) -> Result<bool> {
        tracing::debug!("service start skipped");
        Ok(false)
    }
}

/// Publishes fetched releases on a watch channel when the gate reaches
/// Ready. The gate itself never blocks on the fetch; the receiver gets a
/// short bounded wait after evaluation before the preference wins.
struct WatchFetchTrigger {
    repo: String,
    api_base: String,
    slot: Arc<Mutex<Option<watch::Receiver<Vec<Release>>>>>,
}

impl ReleaseFetchTrigger for WatchFetchTrigger {
    fn trigger_fetch(&self) {
        let rx = releases::spawn_fetch(GithubReleaseSource::new(&self.repo, &self.api_base));
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(rx);
        }
    }
}

/// Interactive operator backed by stdin prompts
struct ConsoleOperator {
    assume_yes: bool,
}

fn prompt_yes_no(prompt: &str) -> bool {
    print!("{prompt} [y/N]: ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }

    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

impl Operator for ConsoleOperator {
    fn confirm_wipe(&self, layout: InstallationLayout) -> WipeDecision {
        match layout {
            InstallationLayout::Legacy => {
                println!("⚠️  A bootstrap from a deprecated layout was found.");
                println!("   Continuing requires wiping the bootstrap directory.");
            }
            InstallationLayout::PreLegacy => {
                println!("⚠️  A bootstrap from a pre-1.0 layout was found.");
                println!("   Continuing requires clearing all application data.");
            }
            InstallationLayout::Current => return WipeDecision::ConfirmWipe,
        }

        if self.assume_yes || prompt_yes_no("Clear and install?") {
            WipeDecision::ConfirmWipe
        } else {
            WipeDecision::Cancel
        }
    }

    fn grant_storage_access(&self) -> bool {
        println!("⚠️  Storage access to the data root is required.");
        if self.assume_yes {
            return true;
        }
        prompt_yes_no("Retry after granting access?")
    }
}

async fn run_gate(config: &GateConfig, yes: bool, skip_service: bool, offline: bool) -> Result<()> {
    let prefs = ensure_release_preference(config)?;

    let probe: Box<dyn CapabilityProbe> = if offline {
        Box::new(OfflineProbe {
            inner: device_probe(config),
        })
    } else {
        Box::new(device_probe(config))
    };

    let service: Box<dyn BackgroundService> = if skip_service {
        Box::new(NullService)
    } else {
        Box::new(ServiceSupervisor::new(
            config.service.command.clone(),
            config.pid_file(),
        ))
    };

    let release_slot = Arc::new(Mutex::new(None));
    let gate = BootstrapGate::new(
        Box::new(MarkerLayoutProbe::new(
            config.legacy_marker(),
            config.pre_legacy_marker(),
        )),
        Box::new(ProotBootstrapRepository::new(
            config.bootstrap_root(),
            &config.bootstrap.proot_launcher,
        )),
        probe,
        Box::new(ConsoleOperator { assume_yes: yes }),
        service,
        Box::new(WatchFetchTrigger {
            repo: config.releases.repo.clone(),
            api_base: config.releases.api_base.clone(),
            slot: release_slot.clone(),
        }),
        vec![
            // The clear has to erase everything the layout probe reads, or
            // the next run re-detects the deprecated layout and re-prompts.
            Box::new(PrivilegedClear::new(
                vec![config.data_root(), config.bootstrap_root()],
                vec![config.pre_legacy_marker()],
            )),
            Box::new(ShellClear::default()),
        ],
        &config.bootstrap.app_id,
    );

    match gate.evaluate()? {
        GateOutcome::LaunchInstall => {
            let release = selected_release(&release_slot, &prefs).await;
            println!("🚀 Bootstrap not installed - handing off to installation flow (release {release})");
            Ok(())
        }
        GateOutcome::LaunchMain => {
            println!("✅ Bootstrap installed - resuming main flow");
            Ok(())
        }
        GateOutcome::Parked(reason) => {
            match reason {
                ParkReason::WipeDeclined => {
                    println!("⚠️  Deprecated bootstrap layout kept; nothing was changed");
                }
                ParkReason::AwaitingPermission => {
                    println!("⚠️  Storage access missing; grant it and run the gate again");
                }
                ParkReason::NoNetwork => {
                    println!("⚠️  No network connection; install was not attempted");
                }
            }
            std::process::exit(1);
        }
    }
}

/// Upper bound on waiting for the in-flight release fetch at handoff time.
const RELEASE_FETCH_WAIT: Duration = Duration::from_secs(2);

/// Selection defaults to the latest fetched release. The in-flight fetch
/// gets a bounded wait; on timeout or fetch failure the persisted
/// preference wins.
async fn selected_release(
    slot: &Arc<Mutex<Option<watch::Receiver<Vec<Release>>>>>,
    prefs: &Preferences,
) -> String {
    let rx = slot.lock().ok().and_then(|mut slot| slot.take());

    if let Some(mut rx) = rx {
        // changed() errors as soon as a failed fetch drops its sender,
        // so a dead fetch never burns the full wait
        let _ = tokio::time::timeout(RELEASE_FETCH_WAIT, rx.changed()).await;

        let list = rx.borrow().clone();
        if !list.is_empty() {
            let mut tracker = ReleaseTracker::new();
            tracker.update(list);
            if let Some(name) = tracker.selected() {
                return name.to_string();
            }
        }
    }

    prefs.current_release.clone()
}

async fn check_gate(config: &GateConfig, fetch_releases: bool, json: bool) -> Result<()> {
    let layout = MarkerLayoutProbe::new(config.legacy_marker(), config.pre_legacy_marker()).probe();
    let repo = ProotBootstrapRepository::new(
        config.bootstrap_root(),
        &config.bootstrap.proot_launcher,
    );
    let probe = device_probe(config);

    let mut prefs = Preferences::load(&preferences_path(config)).unwrap_or_default();
    prefs.ensure_release_default();

    let (release_list, release_error) = if fetch_releases {
        let source = GithubReleaseSource::new(&config.releases.repo, &config.releases.api_base);
        match source.fetch_releases().await {
            Ok(list) => {
                let mut tracker = ReleaseTracker::new();
                tracker.update(list);
                (Some(tracker.releases().to_vec()), None)
            }
            Err(err) => (None, Some(format!("{err:#}"))),
        }
    } else {
        (None, None)
    };

    let bootstrap_installed = repo.is_bootstrap_installed();
    let report = GateReport {
        timestamp: Utc::now().to_rfc3339(),
        installation_state: InstallationState::derive(layout, bootstrap_installed),
        bootstrap_installed,
        storage_access: probe.has_storage_access(),
        network_connected: probe.network_connected(),
        current_release: prefs.current_release,
        releases: release_list,
        release_error,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize gate report")?
        );
    } else {
        print_gate_report(&report);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs_with(release: &str) -> Preferences {
        Preferences {
            current_release: release.to_string(),
        }
    }

    fn release(name: &str) -> Release {
        Release {
            name: name.to_string(),
            tag: format!("v{}", name),
            prerelease: false,
        }
    }

    #[tokio::test]
    async fn test_selected_release_waits_for_late_fetch() {
        let (tx, rx) = watch::channel(Vec::new());
        let slot = Arc::new(Mutex::new(Some(rx)));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(vec![release("1.0.1"), release("1.2.0")]);
        });

        // Fetch lands within the bounded wait, so it beats the preference
        assert_eq!(selected_release(&slot, &prefs_with("1.0.1")).await, "1.2.0");
    }

    #[tokio::test]
    async fn test_selected_release_falls_back_when_fetch_dies() {
        let (tx, rx) = watch::channel(Vec::new());
        let slot = Arc::new(Mutex::new(Some(rx)));
        drop(tx);

        assert_eq!(selected_release(&slot, &prefs_with("1.0.1")).await, "1.0.1");
    }

    #[tokio::test]
    async fn test_selected_release_without_fetch_uses_preference() {
        let slot = Arc::new(Mutex::new(None));
        assert_eq!(selected_release(&slot, &prefs_with("1.0.1")).await, "1.0.1");
    }
}
