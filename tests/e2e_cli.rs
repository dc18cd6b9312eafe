//! CLI end-to-end tests
//!
//! Tests for the dasher command-line interface. None of them need the
//! external tools: packaging runs use `--dry-run`.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the dasher binary
#[allow(deprecated)]
fn dasher_cmd() -> Command {
    let mut cmd = Command::cargo_bin("dasher").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    dasher_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    dasher_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dasher"));
}

#[test]
fn test_cli_run_help() {
    dasher_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_cli_validate_properties() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("clip.properties");
    fs::write(
        &config,
        "input=/media/clip.mp4\noutput=/var/dash/clip\nvideo.1=v1 1280x720 3M\naudio.1=a1 48000 128k 2\ndrm.key=secret\n",
    )
    .unwrap();

    dasher_cmd()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Renditions: 2 (2 enabled)"))
        .stdout(predicate::str::contains("drm.key=********"))
        .stdout(predicate::str::contains("secret").not());
}

#[test]
fn test_cli_validate_json_with_overrides() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");

    let assert = dasher_cmd()
        .current_dir(dir.path())
        .args(["validate", "--json", "input=clip.mp4", "segdur=4"])
        .arg(format!("output={}", output.display()))
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["segdur"], "4");
    assert_eq!(json["mode"], "h264");
}

#[test]
fn test_cli_validate_rejects_root_output() {
    let dir = tempdir().unwrap();
    dasher_cmd()
        .current_dir(dir.path())
        .args(["validate", "input=clip.mp4", "output=/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid output value '/'"));
}

#[test]
fn test_cli_malformed_override() {
    let dir = tempdir().unwrap();
    dasher_cmd()
        .current_dir(dir.path())
        .args(["validate", "segdur"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid override"));
}

#[test]
fn test_cli_run_dry_run_logs_commands() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let log = dir.path().join("dasher.log");

    dasher_cmd()
        .current_dir(dir.path())
        .arg("--log-file")
        .arg(&log)
        .args([
            "run",
            "--dry-run",
            "input=clip.mp4",
            "video.1=v1 640x360 512k",
            "audio.1=a1 48000 128k 2",
            "drm.kid=rng",
            "drm.key=rng",
        ])
        .arg(format!("output={}", output.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN]"))
        .stdout(predicate::str::contains("Renditions: 2"))
        .stdout(predicate::str::contains("DRM: yes"));

    assert!(output.is_dir());
    assert!(!output.join("manifest.mpd").exists());

    let log = fs::read_to_string(&log).unwrap();
    assert!(log.contains("ffmpeg"));
    assert!(log.contains("MP4Box"));
    assert!(log.contains("-crypt"));
    assert!(log.contains("drm.key=********"));
}

#[test]
fn test_cli_run_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");

    dasher_cmd()
        .current_dir(dir.path())
        .args(["run", "input=missing.mp4", "video.1=v1 640x360 512k"])
        .arg(format!("output={}", output.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.mp4"));
}
