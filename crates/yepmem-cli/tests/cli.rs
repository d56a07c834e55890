//! CLI smoke tests for commands that need no provider.

use assert_cmd::Command;
use predicates::prelude::*;

fn yepmem() -> Command {
    Command::cargo_bin("yepmem").expect("binary builds")
}

#[test]
fn status_on_empty_workdir() {
    let dir = tempfile::tempdir().unwrap();

    yepmem()
        .arg("status")
        .arg("--workdir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Code chunks:       0"))
        .stdout(predicate::str::contains("Sync lock:         free"));
}

#[test]
fn status_json_shape() {
    let dir = tempfile::tempdir().unwrap();

    let output = yepmem()
        .arg("status")
        .arg("--workdir")
        .arg(dir.path())
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["codeChunks"], 0);
    assert_eq!(value["lockHeld"], false);
    assert_eq!(value["provider"], "openai");
}

#[test]
fn reset_yes_clears_store() {
    let dir = tempfile::tempdir().unwrap();

    yepmem()
        .arg("reset")
        .arg("--yes")
        .arg("--workdir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared"));
}

#[test]
fn search_without_api_key_fails_fast() {
    let dir = tempfile::tempdir().unwrap();

    yepmem()
        .arg("search")
        .arg("anything")
        .arg("--workdir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn insights_on_empty_store_hints_ingest() {
    let dir = tempfile::tempdir().unwrap();

    yepmem()
        .arg("insights")
        .arg("--workdir")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("yepmem ingest"));
}
