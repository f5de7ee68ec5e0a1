//! Destructive remediation for deprecated bootstrap layouts
//!
//! Legacy layouts are cleared by wiping the bootstrap working directory
//! through the repository's command execution. Pre-legacy layouts need a
//! full application-data clear, chosen from capability-checked strategies:
//! a direct privileged clear when we own the data roots, otherwise a
//! shell-level package-data clear with the app identifier as argument.
//! Either way the clear must leave no trace of the deprecated layout,
//! or the next evaluation would re-detect it and re-prompt forever.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Operator decision on a wipe confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeDecision {
    Cancel,
    ConfirmWipe,
}

pub trait DataClearStrategy {
    fn name(&self) -> &'static str;

    /// Whether this strategy can run on the current host
    fn available(&self) -> bool;

    fn clear(&self, app_id: &str) -> Result<()>;
}

/// Direct clear of data roots we own. Roots are emptied but kept; the
/// stale layout paths are removed outright so a re-probe after the clear
/// no longer sees the deprecated layout.
pub struct PrivilegedClear {
    roots: Vec<PathBuf>,
    stale_paths: Vec<PathBuf>,
}

impl PrivilegedClear {
    pub fn new(roots: Vec<PathBuf>, stale_paths: Vec<PathBuf>) -> Self {
        PrivilegedClear { roots, stale_paths }
    }

    fn writable_dir(path: &Path) -> bool {
        path.is_dir()
            && fs::metadata(path)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false)
    }

    fn empty_dir(root: &Path) -> Result<()> {
        for entry in
            fs::read_dir(root).with_context(|| format!("Failed to read {}", root.display()))?
        {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            }
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        }

        Ok(())
    }
}

impl DataClearStrategy for PrivilegedClear {
    fn name(&self) -> &'static str {
        "privileged"
    }

    fn available(&self) -> bool {
        self.roots.iter().any(|root| Self::writable_dir(root))
            || self.stale_paths.iter().any(|path| path.exists())
    }

    fn clear(&self, app_id: &str) -> Result<()> {
        tracing::info!(app_id, "clearing application data");

        for root in &self.roots {
            if !root.is_dir() {
                continue;
            }
            tracing::debug!(root = %root.display(), "emptying data root");
            Self::empty_dir(root)?;
        }

        for path in &self.stale_paths {
            if !path.exists() {
                continue;
            }
            tracing::debug!(path = %path.display(), "removing stale layout path");
            if path.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            }
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        }

        Ok(())
    }
}

/// Fallback: external package tool invoked with the app identifier
pub struct ShellClear {
    tool: String,
}

impl ShellClear {
    pub fn new(tool: &str) -> Self {
        ShellClear {
            tool: tool.to_string(),
        }
    }
}

impl Default for ShellClear {
    fn default() -> Self {
        ShellClear::new("pm")
    }
}

impl DataClearStrategy for ShellClear {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn available(&self) -> bool {
        Command::new("which")
            .arg(&self.tool)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn clear(&self, app_id: &str) -> Result<()> {
        tracing::info!(app_id, tool = %self.tool, "clearing application data via package tool");

        let status = Command::new(&self.tool)
            .args(["clear", app_id])
            .status()
            .with_context(|| format!("Failed to execute: {} clear {}", self.tool, app_id))?;

        if !status.success() {
            anyhow::bail!("Data clear failed: {} clear {}", self.tool, app_id);
        }

        Ok(())
    }
}

/// Pick the first strategy available on this host
pub fn select_clear_strategy(
    strategies: &[Box<dyn DataClearStrategy>],
) -> Option<&dyn DataClearStrategy> {
    strategies
        .iter()
        .find(|s| s.available())
        .map(|s| &**s)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStrategy {
        name: &'static str,
        available: bool,
    }

    impl DataClearStrategy for FakeStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn available(&self) -> bool {
            self.available
        }

        fn clear(&self, _app_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_selection_prefers_first_available() {
        let strategies: Vec<Box<dyn DataClearStrategy>> = vec![
            Box::new(FakeStrategy {
                name: "privileged",
                available: false,
            }),
            Box::new(FakeStrategy {
                name: "shell",
                available: true,
            }),
        ];

        let selected = select_clear_strategy(&strategies).unwrap();
        assert_eq!(selected.name(), "shell");
    }

    #[test]
    fn test_selection_none_available() {
        let strategies: Vec<Box<dyn DataClearStrategy>> = vec![Box::new(FakeStrategy {
            name: "privileged",
            available: false,
        })];

        assert!(select_clear_strategy(&strategies).is_none());
    }

    #[test]
    fn test_privileged_clear_empties_data_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prefs.toml"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("home/config")).unwrap();

        let strategy = PrivilegedClear::new(vec![dir.path().to_path_buf()], vec![]);
        assert!(strategy.available());
        strategy.clear("com.octostrap.companion").unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        // Data root itself survives the clear
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_privileged_clear_removes_stale_paths_outside_roots() {
        let dir = tempfile::tempdir().unwrap();
        let data_root = dir.path().join("data");
        let marker = dir.path().join("bootstrap-root/home");
        std::fs::create_dir_all(&data_root).unwrap();
        std::fs::write(data_root.join("prefs.toml"), "x").unwrap();
        std::fs::create_dir_all(marker.join("profile")).unwrap();

        let strategy = PrivilegedClear::new(vec![data_root.clone()], vec![marker.clone()]);
        strategy.clear("com.octostrap.companion").unwrap();

        assert_eq!(std::fs::read_dir(&data_root).unwrap().count(), 0);
        // The marker itself is removed, not just emptied
        assert!(!marker.exists());
    }

    #[test]
    fn test_privileged_clear_available_with_only_stale_paths() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("home");
        std::fs::create_dir_all(&marker).unwrap();

        let strategy =
            PrivilegedClear::new(vec![dir.path().join("missing-data")], vec![marker.clone()]);
        assert!(strategy.available());
        strategy.clear("com.octostrap.companion").unwrap();
        assert!(!marker.exists());
    }

    #[test]
    fn test_privileged_clear_unavailable_without_any_target() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = PrivilegedClear::new(
            vec![dir.path().join("missing")],
            vec![dir.path().join("also-missing")],
        );
        assert!(!strategy.available());
    }
}
