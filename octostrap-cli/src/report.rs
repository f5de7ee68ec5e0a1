//! Gate probe report
//!
//! Read-only snapshot of every input the gate would consult, for
//! `octostrap gate check`. No remediation, no service start, no handoff.

use crate::gate::layout::InstallationState;
use crate::releases::Release;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GateReport {
    pub timestamp: String,
    pub installation_state: InstallationState,
    pub bootstrap_installed: bool,
    pub storage_access: bool,
    pub network_connected: bool,
    pub current_release: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub releases: Option<Vec<Release>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_error: Option<String>,
}

impl GateReport {
    /// Whether the gate would reach a terminal state as probed
    pub fn would_proceed(&self) -> bool {
        match self.installation_state {
            InstallationState::Installed => self.storage_access,
            InstallationState::NotInstalled => self.storage_access && self.network_connected,
            InstallationState::LegacyInstalled | InstallationState::PreLegacyInstalled => false,
        }
    }
}

fn glyph(ok: bool) -> &'static str {
    if ok { "✅" } else { "❌" }
}

/// Print the report in human-readable form
pub fn print_gate_report(report: &GateReport) {
    println!("🖨️  octostrap Gate Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Generated: {}", report.timestamp);
    println!();

    println!("📋 Installation:");
    println!("  state: {:?}", report.installation_state);
    println!(
        "  {} bootstrap installed: {}",
        glyph(report.bootstrap_installed),
        report.bootstrap_installed
    );
    println!("  current release preference: {}", report.current_release);

    println!();
    println!("🔧 Capabilities:");
    println!(
        "  {} storage access: {}",
        glyph(report.storage_access),
        report.storage_access
    );
    println!(
        "  {} network connected: {}",
        glyph(report.network_connected),
        report.network_connected
    );

    if let Some(ref releases) = report.releases {
        println!();
        println!("📦 Releases ({}):", releases.len());
        for (i, release) in releases.iter().enumerate() {
            if i == 0 {
                println!("  ✨ latest ({})", release.name);
            } else {
                println!("     {}", release.name);
            }
        }
    }

    if let Some(ref err) = report.release_error {
        println!();
        println!("⚠️  Release fetch failed: {}", err);
    }

    println!();
    if report.would_proceed() {
        println!("✅ Gate would proceed");
    } else {
        println!("⚠️  Gate would park awaiting operator action");
    }
}
