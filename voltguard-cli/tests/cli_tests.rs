//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Build command for the voltguard-cli binary (finds it in target/debug when run via cargo test).
fn voltguard_cli() -> Command {
    cargo_bin_cmd!("voltguard-cli")
}

/// Path to voltguard library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("voltguard")
        .join("tests")
        .join("fixtures")
}

fn panel() -> PathBuf {
    fixtures_dir().join("panel_lp1.json")
}

fn single_branch() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{
            "id": "T-1",
            "conductor_size": "12 AWG",
            "length_m": 20.0,
            "current_a": 20.0,
            "voltage_v": 230.0,
            "power_factor": 0.9
        }"#,
    )
    .unwrap();
    file
}

#[test]
fn test_cli_help() {
    let mut cmd = voltguard_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("voltage-drop"));
}

#[test]
fn test_cli_version() {
    let mut cmd = voltguard_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_compliant_file() {
    let file = single_branch();
    let mut cmd = voltguard_cli();

    cmd.arg("check").arg(file.path()).arg("--fail-on-noncompliant");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Circuit: T-1"))
        .stdout(predicate::str::contains("compliant"));
}

#[test]
fn test_cli_check_panel_reports_problems() {
    let mut cmd = voltguard_cli();

    cmd.arg("check").arg(panel());

    // Problems are reported but do not fail the run without the flag
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("LP1-07"))
        .stdout(predicate::str::contains("Upgrade conductor size"))
        .stdout(predicate::str::contains("Circuits:      4"));
}

#[test]
fn test_cli_check_with_fail_on_noncompliant() {
    let mut cmd = voltguard_cli();

    cmd.arg("check").arg(panel()).arg("--fail-on-noncompliant");

    cmd.assert().failure().code(1);
}

#[test]
fn test_cli_check_json_output() {
    let mut cmd = voltguard_cli();

    cmd.arg("check").arg(panel()).arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["stats"]["total"], 4);
    assert_eq!(json["circuits"].as_array().unwrap().len(), 4);
    assert!(json["combined"].is_null());
}

#[test]
fn test_cli_check_combined_drop() {
    let mut cmd = voltguard_cli();

    cmd.arg("check")
        .arg(panel())
        .arg("--combined")
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["combined"]["segments"].as_array().unwrap().len(), 4);
    assert_eq!(json["combined"]["max_allowed_percent"], 5.0);
}

#[test]
fn test_cli_check_nonexistent_file() {
    let mut cmd = voltguard_cli();

    cmd.arg("check").arg("/nonexistent/panel.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read circuits"));
}

#[test]
fn test_cli_check_malformed_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();

    let mut cmd = voltguard_cli();
    cmd.arg("check").arg(file.path());

    cmd.assert().failure().code(1);
}

#[test]
fn test_cli_size_command() {
    let mut cmd = voltguard_cli();

    cmd.arg("size").arg(panel()).arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let long_branch = json
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["circuit_id"] == "LP1-07")
        .unwrap();
    assert_eq!(long_branch["current_size"], "12 AWG");
    assert_ne!(long_branch["recommended_size"], "12 AWG");
}

#[test]
fn test_cli_sweep_sizes() {
    let mut cmd = voltguard_cli();

    cmd.arg("sweep")
        .arg(panel())
        .arg("--circuit")
        .arg("LP1-07")
        .arg("--sizes")
        .arg("12 AWG,10 AWG,8 AWG,6 AWG");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("4 variant(s)"))
        .stdout(predicate::str::contains("Best compliant"))
        .stderr(predicate::str::contains("[4/4]"));
}

#[test]
fn test_cli_sweep_length_range_json() {
    let file = single_branch();
    let mut cmd = voltguard_cli();

    cmd.arg("sweep")
        .arg(file.path())
        .arg("--length-range")
        .args(["10", "50", "5"])
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_jobs"], 5);
    assert_eq!(json["results"][0]["label"], "10.00 m");
    assert_eq!(json["results"][4]["label"], "50.00 m");
}

#[test]
fn test_cli_sweep_needs_circuit_for_multi_circuit_file() {
    let mut cmd = voltguard_cli();

    cmd.arg("sweep").arg(panel()).arg("--sizes").arg("10 AWG");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--circuit"));
}

#[test]
fn test_cli_sweep_needs_strategy() {
    let file = single_branch();
    let mut cmd = voltguard_cli();

    cmd.arg("sweep").arg(file.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--sizes or --length-range"));
}

#[test]
fn test_cli_sweep_rejects_oversized_length_range() {
    let file = single_branch();
    let mut cmd = voltguard_cli();

    cmd.arg("sweep")
        .arg(file.path())
        .arg("--length-range")
        .args(["0", "1", "1e18"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("STEPS must be at most 10000"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_cli_views_command() {
    let mut cmd = voltguard_cli();

    cmd.arg("views");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("voltage-drop"))
        .stdout(predicate::str::contains("load-schedule"))
        .stdout(predicate::str::contains("ampacity"));
}

#[test]
fn test_cli_views_verbose() {
    let mut cmd = voltguard_cli();

    cmd.arg("views").arg("--verbose");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("conductor_size -> wire_size"));
}

#[test]
fn test_cli_config_file() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    config
        .write_all(br#"{ "defaults": { "insulation_class": "TW", "ambient_temp_c": 45.0 } }"#)
        .unwrap();
    let file = single_branch();

    let mut cmd = voltguard_cli();
    cmd.arg("--config")
        .arg(config.path())
        .arg("check")
        .arg(file.path())
        .arg("--fail-on-noncompliant");

    // Derated 12 AWG at 45 °C cannot carry 20 A
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("inadequate"));
}

#[test]
fn test_cli_invalid_config_rejected() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    config.write_all(br#"{ "batch": { "max_concurrency": 0 } }"#).unwrap();
    let file = single_branch();

    let mut cmd = voltguard_cli();
    cmd.arg("--config").arg(config.path()).arg("check").arg(file.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
