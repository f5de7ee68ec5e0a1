//! CLI smoke tests for the gate binary

use assert_cmd::Command;
use std::fs;
use std::path::Path;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let root = dir.join("bootstrap-root");
    let data = dir.join("data");
    fs::create_dir_all(&root).unwrap();
    fs::create_dir_all(&data).unwrap();

    let config = format!(
        r#"
[bootstrap]
root = "{root}"
legacy_marker = "{root}/bootstrap/add-user.sh"
pre_legacy_marker = "{root}/home"
app_id = "com.octostrap.companion"
data_root = "{data}"

[releases]
repo = "octostrap/bootstrap-builds"

[probes]
network_endpoint = "127.0.0.1:1"
timeout_ms = 100

[service]
command = ["true"]
pid_file = "{data}/service.pid"
"#,
        root = root.display(),
        data = data.display(),
    );

    let path = dir.join("octostrap.toml");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_help() {
    Command::cargo_bin("octostrap")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn test_gate_check_reports_not_installed() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let assert = Command::cargo_bin("octostrap")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "gate", "check"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("NotInstalled"));
    assert!(stdout.contains("storage access: true"));
}

#[test]
fn test_gate_check_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let assert = Command::cargo_bin("octostrap")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "gate",
            "check",
            "--json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["installation_state"], "NotInstalled");
    assert_eq!(report["current_release"], "1.0.1");
}

#[test]
fn test_gate_check_detects_legacy_marker() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let marker = dir.path().join("bootstrap-root/bootstrap/add-user.sh");
    fs::create_dir_all(marker.parent().unwrap()).unwrap();
    fs::write(&marker, "#!/bin/sh\n").unwrap();

    let assert = Command::cargo_bin("octostrap")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "gate", "check"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("LegacyInstalled"));
    assert!(stdout.contains("park"));
}

#[test]
fn test_gate_run_parks_offline_when_not_installed() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    // Not installed + --offline: the install action is network-gated
    let assert = Command::cargo_bin("octostrap")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "gate",
            "run",
            "--offline",
            "--skip-service",
        ])
        .assert()
        .failure();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("No network connection"));
}

#[test]
fn test_gate_run_resumes_main_offline_when_installed() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    // Installed resume path is not network-gated
    fs::create_dir_all(dir.path().join("bootstrap-root/bootstrap")).unwrap();

    let assert = Command::cargo_bin("octostrap")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "gate",
            "run",
            "--offline",
            "--skip-service",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("resuming main flow"));
}

#[test]
fn test_missing_config_is_an_error() {
    Command::cargo_bin("octostrap")
        .unwrap()
        .args(["--config", "/nonexistent/octostrap.toml", "gate", "check"])
        .assert()
        .failure();
}
