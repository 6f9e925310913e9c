//! CLI tests for the epiphase driver.
//!
//! These tests run the binary end to end: example generation, trend,
//! estimation, configuration commands, and the exit codes of failures.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for the epiphase binary, isolated from any user config.
fn epiphase(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("epiphase").expect("epiphase binary should exist");
    cmd.env_remove("EP_CONFIG")
        .env("EP_CONFIG_DIR", config_dir)
        .env("XDG_CONFIG_HOME", config_dir)
        .env("EP_LOG", "off");
    cmd
}

/// Write example SIR records for `days` days and return their path.
fn example_records(dir: &TempDir, days: usize) -> PathBuf {
    let output = epiphase(dir.path())
        .args(["example", "--model", "sir", "--days", &days.to_string()])
        .output()
        .expect("example should run");
    assert!(output.status.success());
    let path = dir.path().join("records.json");
    std::fs::write(&path, &output.stdout).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn example_writes_records_document() {
        let dir = TempDir::new().unwrap();
        let output = epiphase(dir.path())
            .args(["example", "--model", "SIR-F", "--days", "20"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["command"], "example");
        assert_eq!(json["population"], 1_000_000);
        assert_eq!(json["records"].as_array().unwrap().len(), 21);
    }

    #[test]
    fn example_jsonl_writes_one_record_per_line() {
        let dir = TempDir::new().unwrap();
        epiphase(dir.path())
            .args(["example", "--model", "sir", "--days", "9", "--format", "jsonl"])
            .assert()
            .success()
            .stdout(predicate::function(|out: &str| out.lines().count() == 10));
    }

    #[test]
    fn trend_reports_phases() {
        let dir = TempDir::new().unwrap();
        let records = example_records(&dir, 60);
        let output = epiphase(dir.path())
            .args(["trend", "--records"])
            .arg(&records)
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["status"], "OK_CLEAN");
        assert_eq!(json["series"], "Main");
        let phases = json["phases"].as_array().unwrap();
        assert_eq!(phases.len(), json["trend"]["ranges"].as_array().unwrap().len());
        assert_eq!(phases[0]["phase"], "0th");
    }

    #[test]
    fn estimate_fits_every_phase() {
        let dir = TempDir::new().unwrap();
        let records = example_records(&dir, 40);
        let output = epiphase(dir.path())
            .args(["--preset", "quick", "estimate", "--model", "sir", "--tau", "1440"])
            .args(["--trials", "400", "--records"])
            .arg(&records)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));
        let json = stdout_json(&output);
        assert_eq!(json["estimation"]["model"], "SIR");
        assert_eq!(json["estimation"]["tau"], 1440);
        let outcomes = json["estimation"]["outcomes"].as_array().unwrap();
        assert!(!outcomes.is_empty());
        assert!(outcomes.iter().all(|o| o["status"] == "estimated"));
    }

    #[test]
    fn summary_selects_columns() {
        let dir = TempDir::new().unwrap();
        let records = example_records(&dir, 30);
        epiphase(dir.path())
            .args(["summary", "--columns", "Phase,Start,End", "--format", "jsonl", "--records"])
            .arg(&records)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"Phase\":\"0th\""))
            .stdout(predicate::str::contains("ODE").not());
    }

    #[test]
    fn config_presets_are_listed() {
        let dir = TempDir::new().unwrap();
        epiphase(dir.path())
            .args(["config", "presets"])
            .assert()
            .success()
            .stdout(predicate::str::contains("thorough"));
    }

    #[test]
    fn summary_format_is_one_line() {
        let dir = TempDir::new().unwrap();
        epiphase(dir.path())
            .args(["--format", "summary", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("[run-"))
            .stdout(predicate::str::contains("builtin default"));
    }
}

// ============================================================================
// Errors and exit codes
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn missing_records_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        epiphase(dir.path())
            .args(["trend", "--records", "/nonexistent/epiphase/records.json"])
            .assert()
            .code(21)
            .stderr(predicate::str::contains("\"code\":60"));
    }

    #[test]
    fn empty_records_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"population": 1000, "records": []}"#).unwrap();
        epiphase(dir.path())
            .args(["trend", "--records"])
            .arg(&path)
            .assert()
            .code(12)
            .stderr(predicate::str::contains("\"category\":\"records\""));
    }

    #[test]
    fn invalid_config_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"estimation": {"trial_budget": 0}}"#).unwrap();
        epiphase(dir.path())
            .args(["config", "validate"])
            .arg(&path)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("estimation.trial_budget"));
    }

    #[test]
    fn unknown_model_is_rejected_by_parser() {
        let dir = TempDir::new().unwrap();
        epiphase(dir.path())
            .args(["example", "--model", "seir-x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown model"));
    }

    #[test]
    fn unknown_command_fails() {
        let dir = TempDir::new().unwrap();
        epiphase(dir.path())
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}
