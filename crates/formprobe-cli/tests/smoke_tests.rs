//! Smoke tests for the formprobe CLI
//!
//! None of these need a browser: they stop before launch or fail at
//! executable resolution.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: [&str; 7] = [
    "FORMPROBE_BASE_URL",
    "FORMPROBE_BROWSER",
    "FORMPROBE_BROWSER_PATH",
    "FORMPROBE_HEADLESS",
    "FORMPROBE_NO_SANDBOX",
    "FORMPROBE_ELEMENT_TIMEOUT_MS",
    "RUST_LOG",
];

/// Get a command for the formprobe binary with a clean environment
fn formprobe() -> Command {
    let mut cmd = Command::cargo_bin("formprobe").expect("formprobe binary should exist");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    formprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.2.0"));
}

#[test]
fn test_help_flag() {
    formprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--print-scenario"))
        .stdout(predicate::str::contains("--report"));
}

#[test]
fn test_unknown_browser_rejected() {
    formprobe()
        .args(["--browser", "firefox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("firefox"));
}

// ============================================================================
// Scenario Printing
// ============================================================================

#[test]
fn test_print_scenario_lists_steps() {
    formprobe()
        .arg("--print-scenario")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: web_form"))
        .stdout(predicate::str::contains("input_is_disabled"))
        .stdout(predicate::str::contains("dropdown_options_share_hover_color"))
        .stdout(predicate::str::contains("submission_url_carries_form_data"));
}

#[test]
fn test_print_scenario_uses_base_url() {
    formprobe()
        .args(["--print-scenario", "--base-url", "http://localhost:8000/form/"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "http://localhost:8000/form/submitted.html?my-name=",
        ));
}

#[test]
fn test_printed_scenario_is_loadable() {
    let dir = TempDir::new().unwrap();
    let out = formprobe().arg("--print-scenario").output().unwrap();
    assert!(out.status.success());
    let path = dir.path().join("web_form.yaml");
    fs::write(&path, &out.stdout).unwrap();

    let scenario = formprobe::Scenario::from_file(&path).unwrap();
    assert_eq!(scenario.steps.len(), 9);
}

// ============================================================================
// Configuration Errors (exit 2)
// ============================================================================

#[test]
fn test_relative_base_url_is_config_error() {
    formprobe()
        .args(["--base-url", "tiptop/"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_bad_env_value_is_config_error() {
    formprobe()
        .env("FORMPROBE_HEADLESS", "sometimes")
        .arg("--print-scenario")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("FORMPROBE_HEADLESS"));
}

#[test]
fn test_print_scenario_with_scenario_file_rejected() {
    formprobe()
        .args(["--print-scenario", "--scenario", "checks.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_zero_timeout_rejected() {
    formprobe()
        .args(["--timeout", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--timeout must be positive"));
}

#[cfg(feature = "browser")]
#[test]
fn test_verbose_run_announces_browser() {
    formprobe()
        .args(["-v", "--browser-path", "/nonexistent/chromium", "--color", "never"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("INFO 1 scenario(s) against"))
        .stdout(predicate::str::contains("chromium (headless)"));
}

#[test]
fn test_missing_config_file() {
    formprobe()
        .args(["--config", "/nonexistent/formprobe.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("/nonexistent/formprobe.yaml"));
}

#[test]
fn test_invalid_scenario_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "name: empty\nsteps: []\n").unwrap();

    formprobe()
        .arg("--scenario")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Scenario error"));
}

#[test]
fn test_config_file_overrides_base_url() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("formprobe.yaml");
    fs::write(&path, "base_url: http://127.0.0.1:9000/site/\n").unwrap();

    formprobe()
        .arg("--config")
        .arg(&path)
        .arg("--print-scenario")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:9000/site/submitted.html"));
}

// ============================================================================
// Launch Failure (exit 1, fatal recorded)
// ============================================================================

#[cfg(feature = "browser")]
#[test]
fn test_missing_browser_is_fatal_launch() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.json");

    formprobe()
        .args(["--browser-path", "/nonexistent/chromium", "--color", "never"])
        .arg("--report")
        .arg(&report)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL launch"))
        .stdout(predicate::str::contains("/nonexistent/chromium"))
        .stdout(predicate::str::contains("SKIP input_is_disabled"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let scenario = &json["scenarios"][0];
    assert_eq!(scenario["scenario"], "web_form");
    assert_eq!(scenario["fatal"]["kind"], "launch");
    let steps = scenario["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 9);
    assert!(steps.iter().all(|s| s["status"] == "skipped"));
}
