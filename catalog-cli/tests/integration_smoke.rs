//! Smoke tests to verify command wiring

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn catalog() -> Command {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.env_remove("DATABASE_URL").env_remove("RUST_LOG");
    cmd
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// === Help Tests ===

#[test]
fn test_top_level_help() {
    catalog()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn test_serve_help() {
    catalog()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"))
        .stdout(predicate::str::contains("--database-url"));
}

#[test]
fn test_probe_help() {
    catalog()
        .arg("probe")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file"));
}

#[test]
fn test_completions_bash() {
    catalog()
        .arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog"));
}

// === Probe Tests ===

#[test]
fn test_probe_falls_back_to_memory() {
    let config = config_file(
        r#"
        [database]
        connect_timeout_secs = 2

        [[database.candidates]]
        name = "gone"
        url = "sqlite:/nonexistent-catalog-dir/primary.db?mode=rw"
        driver = "sqlite"
        "#,
    );

    catalog()
        .arg("probe")
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(2s per attempt)"))
        .stdout(predicate::str::contains("1. gone [candidate #1] failed"))
        .stdout(predicate::str::contains("2. local-fallback [local fallback] ok"))
        .stdout(predicate::str::contains("will not survive a restart"));
}

#[test]
fn test_probe_fails_when_nothing_connects() {
    let config = config_file(
        r#"
        [database]
        local_fallback = "sqlite:/nonexistent-catalog-dir/fallback.db?mode=rw"
        "#,
    );

    catalog()
        .arg("probe")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no database target reachable"));
}

#[test]
fn test_missing_explicit_config_fails() {
    catalog()
        .arg("probe")
        .arg("--config")
        .arg("/nonexistent-catalog-dir/config.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config not found"));
}
