//! Device capability probes
//!
//! Camera enumeration is fire-and-forget and never gates progression;
//! storage access is re-evaluated on every ask (the grant can change
//! between evaluations); network reachability is a bounded TCP probe.

use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

pub trait CapabilityProbe {
    /// Kick camera enumeration in the background. Results are only logged;
    /// nothing waits on completion.
    fn enumerate_cameras(&self);

    /// Read + write access to the data root
    fn has_storage_access(&self) -> bool;

    /// Active, connected network
    fn network_connected(&self) -> bool;
}

/// Probe implementation against the real device
pub struct DeviceProbe {
    data_root: PathBuf,
    video_dir: PathBuf,
    network_endpoint: String,
    timeout: Duration,
}

impl DeviceProbe {
    pub fn new(
        data_root: PathBuf,
        video_dir: PathBuf,
        network_endpoint: String,
        timeout: Duration,
    ) -> Self {
        DeviceProbe {
            data_root,
            video_dir,
            network_endpoint,
            timeout,
        }
    }
}

impl CapabilityProbe for DeviceProbe {
    fn enumerate_cameras(&self) {
        let video_dir = self.video_dir.clone();

        std::thread::spawn(move || {
            let mut cameras = Vec::new();

            if let Ok(entries) = fs::read_dir(&video_dir) {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.starts_with("video") {
                        cameras.push(name);
                    }
                }
            }

            cameras.sort();
            tracing::info!(count = cameras.len(), ?cameras, "camera enumeration finished");
        });
    }

    fn has_storage_access(&self) -> bool {
        if fs::read_dir(&self.data_root).is_err() {
            return false;
        }

        let probe = self.data_root.join(".storage-probe");
        match fs::write(&probe, b"probe") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        }
    }

    fn network_connected(&self) -> bool {
        let Ok(addrs) = self.network_endpoint.to_socket_addrs() else {
            return false;
        };

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_in(dir: &std::path::Path) -> DeviceProbe {
        DeviceProbe::new(
            dir.to_path_buf(),
            dir.to_path_buf(),
            "127.0.0.1:1".to_string(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn test_storage_access_in_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(probe_in(dir.path()).has_storage_access());
        // Probe file must not be left behind
        assert!(!dir.path().join(".storage-probe").exists());
    }

    #[test]
    fn test_storage_access_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_in(&dir.path().join("does-not-exist"));
        assert!(!probe.has_storage_access());
    }

    #[test]
    fn test_network_probe_unreachable_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        // Port 1 on loopback refuses immediately
        assert!(!probe_in(dir.path()).network_connected());
    }

    #[test]
    fn test_camera_enumeration_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video0"), b"").unwrap();
        // Fire-and-forget: returns immediately, no panic on empty or
        // populated directories
        probe_in(dir.path()).enumerate_cameras();
    }
}
