//! Bootstrap repository - installed-state query and command execution
//!
//! The bootstrap environment is a user-space root emulation layout under a
//! single working directory. Commands either run directly in that directory
//! or inside the proot launcher ("prooted" execution).

use anyhow::{Context, Result};
use std::path::PathBuf;

pub trait BootstrapRepository {
    /// Whether a bootstrap environment is already provisioned
    fn is_bootstrap_installed(&self) -> bool;

    /// Execute a shell command in the bootstrap working directory.
    /// `prooted` wraps the command in the proot launcher script instead of
    /// running it against the host directly. A non-zero exit is an error;
    /// wipe callers rely on that to avoid proceeding over stale state.
    fn run_command(&self, command: &str, prooted: bool) -> Result<()>;
}

/// Production repository shelling into the bootstrap root via duct
pub struct ProotBootstrapRepository {
    root: PathBuf,
    proot_launcher: PathBuf,
}

impl ProotBootstrapRepository {
    pub fn new(root: PathBuf, proot_launcher: &str) -> Self {
        let proot_launcher = root.join(proot_launcher);
        ProotBootstrapRepository {
            root,
            proot_launcher,
        }
    }
}

impl BootstrapRepository for ProotBootstrapRepository {
    fn is_bootstrap_installed(&self) -> bool {
        self.root.join("bootstrap").is_dir()
    }

    fn run_command(&self, command: &str, prooted: bool) -> Result<()> {
        tracing::debug!(command, prooted, "running bootstrap command");

        let expr = if prooted {
            duct::cmd!("sh", &self.proot_launcher, command)
        } else {
            duct::cmd!("sh", "-c", command)
        };

        expr.dir(&self.root)
            .run()
            .with_context(|| format!("Bootstrap command failed: {}", command))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_installed_detection() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ProotBootstrapRepository::new(dir.path().to_path_buf(), "run-bootstrap.sh");
        assert!(!repo.is_bootstrap_installed());

        fs::create_dir_all(dir.path().join("bootstrap")).unwrap();
        assert!(repo.is_bootstrap_installed());
    }

    #[test]
    fn test_run_command_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ProotBootstrapRepository::new(dir.path().to_path_buf(), "run-bootstrap.sh");

        repo.run_command("touch created-by-test", false).unwrap();
        assert!(dir.path().join("created-by-test").exists());
    }

    #[test]
    fn test_run_command_failure_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ProotBootstrapRepository::new(dir.path().to_path_buf(), "run-bootstrap.sh");

        assert!(repo.run_command("exit 3", false).is_err());
    }
}
