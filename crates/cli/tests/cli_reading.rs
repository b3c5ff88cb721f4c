use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

const CODEX_VARS: &[&str] = &[
    "CODEX_BACKEND",
    "CODEX_READING_URL",
    "CODEX_API_KEY",
    "CODEX_MAX_RETRIES",
    "CODEX_RETRY_DELAY_MS",
    "CODEX_RETRY_BACKOFF",
    "CODEX_REQUEST_TIMEOUT_SECS",
    "CODEX_LIMIT_THREE",
    "CODEX_LIMIT_FIVE",
    "CODEX_DECK_PATH",
    "CODEX_LOG_LEVEL",
    "CODEX_LOG_JSON",
    "RUST_LOG",
];

/// `codex` in an empty directory with none of our variables set
fn codex(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("codex").expect("binary built");
    cmd.current_dir(dir.path());
    for var in CODEX_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn spreads_lists_every_position() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .arg("spreads")
        .assert()
        .success()
        .stdout(predicate::str::contains("The Card"))
        .stdout(predicate::str::contains("Obstacle or Blockage"))
        .stdout(predicate::str::contains("unlimited"));
}

#[test]
fn spreads_shows_exhausted_allowance() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .arg("spreads")
        .env("CODEX_LIMIT_FIVE", "0")
        .env("CODEX_LIMIT_THREE", "3")
        .assert()
        .success()
        .stdout(predicate::str::contains("not available"))
        .stdout(predicate::str::contains("limited to 3 per session"));
}

#[test]
fn draw_prints_distinct_cards() {
    let dir = TempDir::new().unwrap();
    let output = codex(&dir)
        .args(["draw", "3", "--json"])
        .output()
        .expect("run ok");
    assert!(output.status.success());

    let cards: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cards.len(), 3);
    let mut ids: Vec<&str> = cards.iter().map(|c| c["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn draw_rejects_impossible_counts() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .args(["draw", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot draw zero cards"));

    codex(&dir)
        .args(["draw", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deck only holds"));
}

#[test]
fn mock_single_reading_has_no_synthesis() {
    let dir = TempDir::new().unwrap();
    let output = codex(&dir)
        .args(["read", "What should I focus on?", "--mock", "--spread", "single", "--json"])
        .output()
        .expect("run ok");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reading: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reading["spreadType"], "single");
    assert_eq!(reading["intention"], "What should I focus on?");
    assert!(reading["synthesis"].is_null());
    assert_eq!(reading["cards"].as_array().unwrap().len(), 1);
    assert_eq!(reading["cards"][0]["position"], "The Card");
    assert!(!reading["oracle"].as_str().unwrap().is_empty());
}

#[test]
fn mock_reading_is_saved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reading.json");

    codex(&dir)
        .args(["read", "Where is this going?", "--mock", "--spread", "three", "--save"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("The Oracle Speaks"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let positions: Vec<&str> = saved["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["position"].as_str().unwrap())
        .collect();
    assert_eq!(positions, ["Past", "Present", "Future"]);
    assert!(saved["synthesis"].is_string());
}

#[test]
fn remaining_allowance_is_per_session() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .args(["read", "Where is this going?", "--mock", "--spread", "three", "--json"])
        .env("CODEX_LIMIT_THREE", "3")
        .assert()
        .success()
        .stderr(predicate::str::contains("2 three reading(s) left in this session"))
        .stderr(predicate::str::contains("this month").not());
}

#[test]
fn exhausted_spread_is_refused() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .args(["read", "Big question", "--mock", "--spread", "five"])
        .env("CODEX_LIMIT_FIVE", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not available"));
}

#[test]
fn blank_intention_is_rejected() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .args(["read", "   ", "--mock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Intention cannot be empty"));
}

#[test]
fn edge_backend_needs_a_url() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .args(["read", "Anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CODEX_READING_URL"));
}

#[test]
fn unreachable_backend_fails_after_retries() {
    let dir = TempDir::new().unwrap();
    codex(&dir)
        .args(["read", "Anything", "--spread", "single"])
        .env("CODEX_READING_URL", "http://127.0.0.1:9/functions/v1/reading")
        .env("CODEX_RETRY_DELAY_MS", "0")
        .env("CODEX_REQUEST_TIMEOUT_SECS", "5")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"));
}
