//! Gate configuration and persisted release preference
//!
//! Reads octostrap.toml and owns the single persisted preference this
//! component touches: the current release version string, defaulted on
//! first run when unset or blank.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Release version written to the preference file on first run.
pub const DEFAULT_RELEASE: &str = "1.0.1";

/// Gate configuration structure matching octostrap.toml
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    pub bootstrap: BootstrapSection,
    pub releases: ReleaseSection,
    #[serde(default)]
    pub probes: ProbeSection,
    pub service: ServiceSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapSection {
    /// Root of the provisioned bootstrap environment
    pub root: String,
    /// Path whose existence signals a legacy (deprecated) layout
    pub legacy_marker: String,
    /// Path whose existence signals a pre-legacy layout
    pub pre_legacy_marker: String,
    /// Application identifier handed to the shell-level data clear
    pub app_id: String,
    /// Data root checked for storage access and cleared on pre-legacy wipe
    pub data_root: String,
    /// proot launcher script used for prooted command execution
    #[serde(default = "default_proot_launcher")]
    pub proot_launcher: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseSection {
    /// GitHub repository in `owner/repo` form
    pub repo: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSection {
    /// host:port probed for network reachability
    #[serde(default = "default_network_endpoint")]
    pub network_endpoint: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    /// Directory scanned for video device nodes
    #[serde(default = "default_video_dir")]
    pub video_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    /// Background service command line (argv form)
    pub command: Vec<String>,
    pub pid_file: String,
}

fn default_proot_launcher() -> String {
    "run-bootstrap.sh".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_network_endpoint() -> String {
    "github.com:443".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_video_dir() -> String {
    "/dev".to_string()
}

impl Default for ProbeSection {
    fn default() -> Self {
        ProbeSection {
            network_endpoint: default_network_endpoint(),
            timeout_ms: default_probe_timeout_ms(),
            video_dir: default_video_dir(),
        }
    }
}

/// Expand a configured path (tilde-aware) into a PathBuf
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Resolve the config path: the explicit path when it exists, otherwise
/// the per-user default under the home directory.
pub fn locate_config(explicit: &Path) -> Result<PathBuf> {
    if explicit.exists() {
        return Ok(explicit.to_path_buf());
    }

    if let Some(home) = dirs::home_dir() {
        let fallback = home.join(".octostrap/octostrap.toml");
        if fallback.exists() {
            return Ok(fallback);
        }
    }

    anyhow::bail!(
        "Gate config not found: {}\nCreate octostrap.toml or ~/.octostrap/octostrap.toml",
        explicit.display()
    )
}

impl GateConfig {
    /// Load gate config from TOML file
    pub fn load(config_path: &Path) -> Result<GateConfig> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn bootstrap_root(&self) -> PathBuf {
        expand_path(&self.bootstrap.root)
    }

    pub fn legacy_marker(&self) -> PathBuf {
        expand_path(&self.bootstrap.legacy_marker)
    }

    pub fn pre_legacy_marker(&self) -> PathBuf {
        expand_path(&self.bootstrap.pre_legacy_marker)
    }

    pub fn data_root(&self) -> PathBuf {
        expand_path(&self.bootstrap.data_root)
    }

    pub fn pid_file(&self) -> PathBuf {
        expand_path(&self.service.pid_file)
    }
}

/// Persisted preferences (session-independent, owned by this component
/// only for the current-release default)
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub current_release: String,
}

impl Preferences {
    /// Load preferences, treating a missing file as empty defaults
    pub fn load(path: &Path) -> Result<Preferences> {
        if !path.exists() {
            return Ok(Preferences::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string(self).context("Failed to serialize preferences")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Apply the first-run default when the persisted release is unset or
    /// blank. Returns true when the value changed and needs saving.
    pub fn ensure_release_default(&mut self) -> bool {
        if self.current_release.trim().is_empty() {
            self.current_release = DEFAULT_RELEASE.to_string();
            true
        } else {
            false
        }
    }
}
