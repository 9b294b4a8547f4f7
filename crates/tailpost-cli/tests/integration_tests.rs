//! Integration tests for the tailpost CLI

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Command isolated from the caller's environment and config.
fn tailpost(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tailpost").unwrap();
    for var in [
        "TAILPOST_CONFIG",
        "TAILPOST_WATCH_DIR",
        "TAILPOST_DOCUMENT",
        "TAILPOST_TOKEN_FILE",
        "TAILPOST_ACCESS_TOKEN",
        "TAILPOST_LOG_DIR",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("TAILPOST_CACHE_FILE", temp.path().join("cache.json"));
    cmd.env("TAILPOST_LOG_DIR", temp.path().join("logs"));
    cmd.arg("--config").arg(temp.path().join("config.toml"));
    cmd
}

fn read_cache(path: &Path) -> Vec<String> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("tailpost").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_cli_help_lists_commands() {
    let mut cmd = Command::cargo_bin("tailpost").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_config_init_then_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.toml");

    let mut cmd = tailpost(&temp);
    cmd.args(["config", "init", "--path"]).arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    assert!(fs::read_to_string(&path).unwrap().contains("[watch]"));

    let mut cmd = tailpost(&temp);
    cmd.args(["config", "init", "--path"]).arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let mut cmd = tailpost(&temp);
    cmd.args(["config", "init", "--force", "--path"]).arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
}

#[test]
fn test_config_show_reflects_file_and_env() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[watch]\ndir = \"/srv/chat\"\n\n[cache]\nmax_entries = 500\n",
    )
    .unwrap();

    let mut cmd = tailpost(&temp);
    cmd.env("TAILPOST_DOCUMENT", "doc-from-env");
    cmd.args(["config", "show", "--format", "json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("/srv/chat"))
        .stdout(predicate::str::contains("\"max_entries\": 500"))
        .stdout(predicate::str::contains("doc-from-env"));
}

#[test]
fn test_cache_clear_and_stats() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");
    fs::write(&cache_file, r#"["one", "two"]"#).unwrap();

    let mut cmd = tailpost(&temp);
    cmd.args(["cache", "stats"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("entries:     2"));

    let mut cmd = tailpost(&temp);
    cmd.args(["cache", "clear"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Cleared line cache"));
    assert!(read_cache(&cache_file).is_empty());
}

#[test]
fn test_cache_stats_rejects_corrupt_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("cache.json"), "{ broken").unwrap();

    let mut cmd = tailpost(&temp);
    cmd.args(["cache", "stats"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read line cache"));
}

#[test]
fn test_run_requires_watch_dir() {
    let temp = TempDir::new().unwrap();

    let mut cmd = tailpost(&temp);
    cmd.arg("run");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_run_with_missing_directory_exits_and_saves_cache() {
    let temp = TempDir::new().unwrap();

    let mut cmd = tailpost(&temp);
    cmd.args(["run", "--watch-dir"])
        .arg(temp.path().join("absent"))
        .args(["--document", "doc-1"]);
    cmd.assert().failure();

    assert!(read_cache(&temp.path().join("cache.json")).is_empty());
}

#[test]
fn test_run_writes_daily_log_file() {
    let temp = TempDir::new().unwrap();

    let mut cmd = tailpost(&temp);
    cmd.args(["run", "--watch-dir"])
        .arg(temp.path().join("absent"))
        .args(["--document", "doc-1"]);
    cmd.assert().failure();

    let logs: Vec<_> = fs::read_dir(temp.path().join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1);
    let name = logs[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("tailpost.") && name.ends_with(".log"));
    assert!(fs::read_to_string(&logs[0]).unwrap().contains("Cannot watch"));
}

#[test]
fn test_config_show_writes_no_log_file() {
    let temp = TempDir::new().unwrap();

    let mut cmd = tailpost(&temp);
    cmd.args(["config", "show"]);
    cmd.assert().success();

    assert!(!temp.path().join("logs").exists());
}
