//! Smoke tests for the `moot` binary
//!
//! These run the compiled binary with `assert_cmd` in a scratch directory.
//! None of them reach a provider: every command here either needs no
//! credentials or fails before the first generation call.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// `moot` rooted in `dir`, with no config file above it and no credentials.
fn moot_in(dir: &Path) -> Command {
    fs::create_dir_all(dir.join(".git")).unwrap();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("moot"));
    cmd.current_dir(dir)
        .env_remove("GROQ_API_KEYS")
        .env_remove("GROQ_MODELS")
        .env_remove("MOOT_HOME")
        .env_remove("RUST_LOG")
        .args(["--state-dir", "state"]);
    cmd
}

#[test]
fn help_lists_commands() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("moot"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("verdict"))
        .stdout(predicate::str::contains("report"));
}

#[test]
fn version_output() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("moot"));
    let version_predicate =
        predicate::str::is_match(r"\b\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?\b").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("moot"))
        .stdout(version_predicate);
}

#[test]
fn report_on_empty_state_dir() {
    let dir = TempDir::new().unwrap();
    moot_in(dir.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cases: 0"));
}

#[test]
fn report_writes_three_csv_files() {
    let dir = TempDir::new().unwrap();
    moot_in(dir.path())
        .args(["report", "--csv", "out"])
        .assert()
        .success();

    for name in [
        "case_counts_by_section.csv",
        "case_counts_by_status.csv",
        "case_counts_by_section_and_status.csv",
    ] {
        assert!(dir.path().join("out").join(name).is_file(), "{name} missing");
    }
}

#[test]
fn status_json_reports_missing_credentials() {
    let dir = TempDir::new().unwrap();
    let output = moot_in(dir.path()).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["cases"]["total"], 0);
    assert!(status["pool"].is_null());
    assert!(
        status["pool_error"]
            .as_str()
            .is_some_and(|e| e.contains("GROQ_API_KEYS"))
    );
    assert_eq!(status["config"]["store.state_dir"]["source"], "cli");
}

#[test]
fn run_without_sections_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    moot_in(dir.path())
        .arg("run")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no sections configured"));
}

#[test]
fn run_without_keys_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    moot_in(dir.path())
        .args(["run", "--section", "302"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("GROQ_API_KEYS"));
    // The lock is released on the way out
    assert!(!dir.path().join("state").join("moot.lock").exists());
}

#[test]
fn held_lock_exits_with_lock_code() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state");
    fs::create_dir_all(&state).unwrap();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let lock = serde_json::json!({
        "pid": std::process::id(),
        "created_at": now,
        "command": "run",
        "moot_version": "0.0.0",
    });
    fs::write(state.join("moot.lock"), lock.to_string()).unwrap();

    moot_in(dir.path())
        .args(["case", "302"])
        .env("GROQ_API_KEYS", "gsk_test")
        .assert()
        .code(9);
}
