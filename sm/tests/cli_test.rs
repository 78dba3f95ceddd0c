//! End-to-end tests for the `sm` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sm() -> Command {
    let mut cmd = Command::cargo_bin("sm").expect("sm binary should build");
    // Keep the ambient environment from changing log output
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_demo_sequence_logs_every_transition() {
    sm().assert()
        .success()
        .stdout(predicate::str::contains("Final state:"))
        .stdout(predicate::str::contains("Actions: 5 (3 transitions, 2 no-ops)"))
        .stderr(predicate::str::contains("state machine started"))
        .stderr(predicate::str::contains("state A -> B"))
        .stderr(predicate::str::contains("state B -> do nothing"))
        .stderr(predicate::str::contains("state B -> A"))
        .stderr(predicate::str::contains("state A -> do nothing"))
        .stderr(predicate::str::contains("trigger close"))
        .stderr(predicate::str::contains("state machine stopped"))
        .stderr(predicate::str::contains("closed"));
}

#[test]
fn test_log_lines_carry_subsystem_prefix() {
    let output = sm().output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    let transitions: Vec<&str> = stderr.lines().filter(|l| l.contains("state A -> B")).collect();
    assert_eq!(transitions.len(), 2);
    assert!(transitions.iter().all(|l| l.contains("state_machine")));
}

#[test]
fn test_json_summary() {
    let output = sm().args(["--format", "json", "a", "b", "b"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["final-state"], "A");
    assert_eq!(json["metrics"]["actions-applied"], 3);
    assert_eq!(json["metrics"]["transitions"], 2);
    assert_eq!(json["metrics"]["ignored"], 1);
    assert_eq!(json["trace"][0]["type"], "started");
}

#[test]
fn test_unknown_event_is_rejected() {
    sm().arg("x").assert().failure().stderr(predicate::str::contains("Unknown event"));
}

#[test]
fn test_initial_state_from_config_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sm.yml");
    std::fs::write(&path, "machine:\n  initial-state: B\n").unwrap();

    let output = sm()
        .args(["--format", "json", "-c"])
        .arg(&path)
        .arg("a")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["trace"][0]["state"], "B");
    assert_eq!(json["final-state"], "B");
    assert_eq!(json["metrics"]["ignored"], 1);
}

#[test]
fn test_log_file_redirects_output() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("sm.log");

    sm().arg("--log-file").arg(&log_path).assert().success();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("state A -> B"));
    assert!(log.contains("state machine stopped"));
}

#[test]
fn test_long_sequence_keeps_full_trace() {
    let events = vec!["a"; 100];
    let output = sm().args(["--format", "json"]).args(&events).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["metrics"]["actions-applied"], 100);

    // Started, one per event, ShutdownRequested, Stopped
    let trace = json["trace"].as_array().unwrap();
    assert_eq!(trace.len(), 103);
    assert_eq!(trace[0]["type"], "started");
    assert_eq!(trace[1]["type"], "transitioned");
    assert!(trace[2..101].iter().all(|n| n["type"] == "ignored"));
    assert_eq!(trace[102]["type"], "stopped");
}

#[test]
fn test_save_config_writes_effective_config() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("in.yml");
    let saved = temp.path().join("out.yml");
    std::fs::write(&source, "machine:\n  initial-state: B\n").unwrap();

    sm().arg("-c").arg(&source).arg("--save-config").arg(&saved).assert().success();

    let written = std::fs::read_to_string(&saved).unwrap();
    assert!(written.contains("initial-state: B"));
    assert!(written.contains("notify-capacity: 64"));
}
