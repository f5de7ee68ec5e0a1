//! Installation layout detection
//!
//! Two filesystem markers distinguish deprecated bootstrap layouts. The
//! legacy marker (installer script left behind by <1.1 layouts) implies a
//! newer, still deprecated layout and must not be shadowed by the
//! pre-legacy home-directory check, so the probe order is fixed.

use serde::Serialize;
use std::path::PathBuf;

/// Layout generation derived from marker probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallationLayout {
    /// No deprecated markers present
    Current,
    /// Deprecated layout, remediated by wiping the bootstrap directory
    Legacy,
    /// Oldest layout, remediated by a full application-data clear
    PreLegacy,
}

/// Derived installation state, recomputed at gate entry and never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallationState {
    NotInstalled,
    Installed,
    LegacyInstalled,
    PreLegacyInstalled,
}

impl InstallationState {
    /// Combine the layout probe with the repository's installed flag.
    /// Deprecated layouts shadow the installed flag.
    pub fn derive(layout: InstallationLayout, bootstrap_installed: bool) -> Self {
        match layout {
            InstallationLayout::Legacy => InstallationState::LegacyInstalled,
            InstallationLayout::PreLegacy => InstallationState::PreLegacyInstalled,
            InstallationLayout::Current => {
                if bootstrap_installed {
                    InstallationState::Installed
                } else {
                    InstallationState::NotInstalled
                }
            }
        }
    }
}

pub trait InstallationLayoutProbe {
    /// Classify the on-disk layout. Probes are bare stat calls with no
    /// retry; any failure reads as "marker not present".
    fn probe(&self) -> InstallationLayout;
}

/// Marker-file probe against two configured paths
pub struct MarkerLayoutProbe {
    legacy_marker: PathBuf,
    pre_legacy_marker: PathBuf,
}

impl MarkerLayoutProbe {
    pub fn new(legacy_marker: PathBuf, pre_legacy_marker: PathBuf) -> Self {
        MarkerLayoutProbe {
            legacy_marker,
            pre_legacy_marker,
        }
    }
}

impl InstallationLayoutProbe for MarkerLayoutProbe {
    fn probe(&self) -> InstallationLayout {
        // Legacy takes priority when both markers are present
        if self.legacy_marker.exists() {
            InstallationLayout::Legacy
        } else if self.pre_legacy_marker.exists() {
            InstallationLayout::PreLegacy
        } else {
            InstallationLayout::Current
        }
    }
}
