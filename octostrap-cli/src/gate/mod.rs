//! Bootstrap gate state machine
//!
//! Decides, from the probed installation state and device capability,
//! whether the operator is routed to the installation flow, resumed into
//! the main flow, or parked awaiting remediation. Evaluation order:
//! probe legacy layout, remediate if confirmed, then from Ready check
//! storage access and (install path only) network before handing off.
//! Parked outcomes are suspended states awaiting operator action, never
//! errors; a failed wipe is an error and stops the gate.

pub mod layout;
pub mod remediation;

pub use layout::{InstallationLayout, InstallationLayoutProbe, InstallationState, MarkerLayoutProbe};
pub use remediation::{
    DataClearStrategy, PrivilegedClear, ShellClear, WipeDecision, select_clear_strategy,
};

use crate::probes::CapabilityProbe;
use crate::repo::BootstrapRepository;
use crate::service::BackgroundService;
use anyhow::{Context, Result};

/// Terminal result of one gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Bootstrap absent, all gates passed - hand off to installation
    LaunchInstall,
    /// Bootstrap present and accessible - resume the main flow
    LaunchMain,
    /// Suspended awaiting operator action
    Parked(ParkReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkReason {
    WipeDeclined,
    AwaitingPermission,
    NoNetwork,
}

/// Blocking operator decision seam (confirmation dialogs in the original
/// surface; prompts or scripted answers here)
pub trait Operator {
    fn confirm_wipe(&self, layout: InstallationLayout) -> WipeDecision;

    /// Issue the storage permission request and report whether the
    /// operator granted it. Denial is not an error.
    fn grant_storage_access(&self) -> bool;
}

/// Fired when the gate reaches Ready; kicks the async release fetch
/// without blocking gate progression.
pub trait ReleaseFetchTrigger {
    fn trigger_fetch(&self);
}

pub struct BootstrapGate {
    layout: Box<dyn InstallationLayoutProbe>,
    repo: Box<dyn BootstrapRepository>,
    probe: Box<dyn CapabilityProbe>,
    operator: Box<dyn Operator>,
    service: Box<dyn BackgroundService>,
    releases: Box<dyn ReleaseFetchTrigger>,
    clear_strategies: Vec<Box<dyn DataClearStrategy>>,
    app_id: String,
}

impl BootstrapGate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layout: Box<dyn InstallationLayoutProbe>,
        repo: Box<dyn BootstrapRepository>,
        probe: Box<dyn CapabilityProbe>,
        operator: Box<dyn Operator>,
        service: Box<dyn BackgroundService>,
        releases: Box<dyn ReleaseFetchTrigger>,
        clear_strategies: Vec<Box<dyn DataClearStrategy>>,
        app_id: &str,
    ) -> Self {
        BootstrapGate {
            layout,
            repo,
            probe,
            operator,
            service,
            releases,
            clear_strategies,
            app_id: app_id.to_string(),
        }
    }

    /// Derived installation state, recomputed on every call
    pub fn installation_state(&self) -> InstallationState {
        InstallationState::derive(self.layout.probe(), self.repo.is_bootstrap_installed())
    }

    /// Run one full gate evaluation
    pub fn evaluate(&self) -> Result<GateOutcome> {
        match self.layout.probe() {
            InstallationLayout::Legacy => {
                match self.operator.confirm_wipe(InstallationLayout::Legacy) {
                    WipeDecision::Cancel => {
                        tracing::info!("legacy wipe declined, gate parked");
                        return Ok(GateOutcome::Parked(ParkReason::WipeDeclined));
                    }
                    WipeDecision::ConfirmWipe => {
                        // Remove all bootstrap-related data
                        self.repo
                            .run_command("rm -rf *", false)
                            .context("Legacy bootstrap wipe failed")?;
                    }
                }
            }
            InstallationLayout::PreLegacy => {
                match self.operator.confirm_wipe(InstallationLayout::PreLegacy) {
                    WipeDecision::Cancel => {
                        tracing::info!("pre-legacy wipe declined, gate parked");
                        return Ok(GateOutcome::Parked(ParkReason::WipeDeclined));
                    }
                    WipeDecision::ConfirmWipe => {
                        let strategy = select_clear_strategy(&self.clear_strategies)
                            .context("No data clear strategy available on this host")?;
                        tracing::info!(strategy = strategy.name(), "clearing pre-legacy data");
                        strategy
                            .clear(&self.app_id)
                            .context("Application data clear failed")?;
                    }
                }
            }
            InstallationLayout::Current => {}
        }

        self.ready()
    }

    /// Ready state: kick the non-blocking probes, then branch on the
    /// persisted installation state.
    fn ready(&self) -> Result<GateOutcome> {
        self.probe.enumerate_cameras();
        self.releases.trigger_fetch();

        if self.repo.is_bootstrap_installed() {
            // Passive resume path is not network-gated
            return self.check_permission(GateOutcome::LaunchMain);
        }

        // Only the explicit install action requires a connected network
        if !self.probe.network_connected() {
            tracing::warn!("no active network connection, install not attempted");
            return Ok(GateOutcome::Parked(ParkReason::NoNetwork));
        }

        self.check_permission(GateOutcome::LaunchInstall)
    }

    /// Storage access is re-evaluated on demand, never cached across the
    /// permission round-trip.
    fn check_permission(&self, destination: GateOutcome) -> Result<GateOutcome> {
        if !self.probe.has_storage_access() {
            let granted = self.operator.grant_storage_access() && self.probe.has_storage_access();
            if !granted {
                tracing::info!("storage access not granted, gate parked");
                return Ok(GateOutcome::Parked(ParkReason::AwaitingPermission));
            }
        }

        self.launch(destination)
    }

    fn launch(&self, destination: GateOutcome) -> Result<GateOutcome> {
        self.service
            .ensure_running()
            .context("Failed to start print service")?;

        tracing::info!(?destination, "gate released");
        Ok(destination)
    }
}
