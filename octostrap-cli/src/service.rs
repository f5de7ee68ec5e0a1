//! Idempotent background service startup
//!
//! The print service must be running before either downstream flow is
//! entered. Startup is check-then-start against a pidfile: if the recorded
//! pid is still alive the call is a no-op.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait BackgroundService {
    /// Ensure the service is running. Returns true when a new process was
    /// spawned, false when one was already alive.
    fn ensure_running(&self) -> Result<bool>;
}

pub struct ServiceSupervisor {
    command: Vec<String>,
    pid_file: PathBuf,
}

impl ServiceSupervisor {
    pub fn new(command: Vec<String>, pid_file: PathBuf) -> Self {
        ServiceSupervisor { command, pid_file }
    }

    fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn pid_alive(pid: u32) -> bool {
        Path::new(&format!("/proc/{pid}")).exists()
    }
}

impl BackgroundService for ServiceSupervisor {
    fn ensure_running(&self) -> Result<bool> {
        if let Some(pid) = self.recorded_pid() {
            if Self::pid_alive(pid) {
                tracing::debug!(pid, "service already running");
                return Ok(false);
            }
        }

        let (program, args) = self
            .command
            .split_first()
            .context("Service command is empty")?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start service: {}", self.command.join(" ")))?;

        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&self.pid_file, child.id().to_string())
            .with_context(|| format!("Failed to write {}", self.pid_file.display()))?;

        tracing::info!(pid = child.id(), "service started");
        Ok(true)
    }
}
