//! Integration tests for the CLI interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_cli_help_flag() {
    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_run_help() {
    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("coordinated run"));
}

#[test]
fn test_worker_help() {
    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("worker")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("worker execution endpoint"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_run_with_missing_config_fails() {
    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("run")
        .arg("--config")
        .arg("/nonexistent/gridrun.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_plan_prints_one_partition_per_worker() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("gridrun.toml");
    fs::write(
        &config_path,
        r#"
        unit = "session-score"
        workers = ["http://localhost:8081", "http://localhost:8082", "http://localhost:8083"]
        "#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("plan")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("partition 0/3 -> http://localhost:8081"))
        .stdout(predicate::str::contains("partition 2/3 -> http://localhost:8083"));
}

#[test]
fn test_plan_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("gridrun.toml");
    fs::write(&config_path, "unit = \"session-score\"\nworkers = []\n").unwrap();

    let mut cmd = Command::cargo_bin("gridrun").unwrap();
    cmd.arg("plan")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("worker"));
}
