//! End-to-end tests for the quotawatch binary over a temp state file.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quotawatch(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quotawatch").expect("binary");
    cmd.arg("--state-file")
        .arg(dir.path().join("state.json"));
    cmd
}

#[test]
fn record_usage_then_status_reports_it() {
    let dir = TempDir::new().expect("temp dir");

    quotawatch(&dir)
        .args(["record-usage", "50000", "refactor auth module"])
        .assert()
        .success();

    quotawatch(&dir)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"used\": 50000"));
}

#[test]
fn status_on_fresh_state_is_empty() {
    let dir = TempDir::new().expect("temp dir");

    quotawatch(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("0/200000 tokens"));
}

#[test]
fn limit_hit_lowers_reported_limit() {
    let dir = TempDir::new().expect("temp dir");

    quotawatch(&dir)
        .args(["record-limit-hit", "88000"])
        .assert()
        .success();

    quotawatch(&dir)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"limit\": 88000"))
        .stdout(predicate::str::contains("\"limit_confidence\": 0.6"));
}

#[test]
fn reset_clears_usage_but_keeps_learned_limit() {
    let dir = TempDir::new().expect("temp dir");

    quotawatch(&dir)
        .args(["record-usage", "50000", "work"])
        .assert()
        .success();
    quotawatch(&dir)
        .args(["record-limit-hit", "88000"])
        .assert()
        .success();
    quotawatch(&dir).arg("reset").assert().success();

    quotawatch(&dir)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"used\": 0"))
        .stdout(predicate::str::contains("\"limit\": 88000"));
}

#[test]
fn malformed_state_reinitializes_instead_of_failing() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("state.json"), "{broken").expect("write garbage");

    quotawatch(&dir).arg("status").assert().success();
}
