//! octostrap-cli - first-run bootstrap gate for the print-server companion
//!
//! Decides, from persisted installation state and device capability,
//! whether to hand off to the installation flow, resume the main flow, or
//! park awaiting operator remediation (permission grant, legacy-data wipe).

pub mod commands;
pub mod config;
pub mod gate;
pub mod probes;
pub mod releases;
pub mod repo;
pub mod report;
pub mod service;

pub use gate::{BootstrapGate, GateOutcome, ParkReason};
pub use releases::{Release, ReleaseTracker};
