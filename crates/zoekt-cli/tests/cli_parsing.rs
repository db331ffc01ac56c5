//! CLI parsing tests for the zoekt-dispatch command

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the zoekt-dispatch binary with an isolated home.
#[allow(deprecated)]
fn dispatch(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("zoekt-dispatch").expect("Failed to find zoekt-dispatch binary");
    cmd.env("HOME", home.path())
        .env_remove("ZOEKT_DISPATCH_CONFIG")
        .env_remove("ZOEKT_DISPATCH_TIMEOUT")
        .env_remove("ZOEKT_JWT_SECRET");
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("proxy"))
        .stdout(predicate::str::contains("nodes"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zoekt-dispatch"));
}

#[test]
fn test_global_options_in_help() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--timeout"));
}

// ============================================================================
// Search Command Tests
// ============================================================================

#[test]
fn test_search_help() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--node"))
        .stdout(predicate::str::contains("--project"))
        .stdout(predicate::str::contains("--regex"))
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_search_requires_node() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["search", "foo", "--project", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--node"));
}

#[test]
fn test_search_regex_conflicts_with_exact() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["search", "foo", "--node", "1", "--regex", "--exact"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_search_invalid_source() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["search", "foo", "--node", "1", "--source", "cli"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ============================================================================
// Proxy Command Tests
// ============================================================================

#[test]
fn test_proxy_requires_target() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["proxy", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target"));
}

#[test]
fn test_proxy_rejects_malformed_target() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["proxy", "foo", "--target", "1:2,3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NODE=ID"));
}

#[test]
fn test_proxy_username_requires_user() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["proxy", "foo", "--target", "1=2", "--username", "alice"])
        .assert()
        .failure();
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_init_creates_global_file() {
    let home = TempDir::new().unwrap();
    dispatch(&home).args(["config", "init"]).assert().success();

    assert!(home
        .path()
        .join(".zoekt-dispatch")
        .join("config.toml")
        .exists());
}

#[test]
fn test_config_get_default_timeout() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["config", "get", "client.timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::diff("30\n"));
}

#[test]
fn test_config_get_respects_timeout_flag() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["--timeout", "5", "config", "get", "client.timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));
}

#[test]
fn test_config_get_respects_ast_payload_flag() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["config", "get", "features.ast_search_payload"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));

    dispatch(&home)
        .args(["--ast-payload", "config", "get", "features.ast_search_payload"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));
}

#[test]
fn test_config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["config", "get", "client.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_path_json() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["config", "path", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"global_exists\": false"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .args(["--config", "/nonexistent/zoekt.toml", "nodes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

// ============================================================================
// Nodes Command Tests
// ============================================================================

#[test]
fn test_nodes_lists_configured_nodes() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("zoekt.toml");
    std::fs::write(
        &config,
        r#"
[[nodes]]
id = 2
name = "zoekt-b"
url = "http://zoekt-b:6080"
search_url = "http://zoekt-b:6090"

[[nodes]]
id = 1
url = "http://zoekt-a:6080"
"#,
    )
    .unwrap();

    dispatch(&home)
        .args(["--config", config.to_str().unwrap(), "nodes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zoekt-1"))
        .stdout(predicate::str::contains("zoekt-b"))
        .stdout(predicate::str::contains("(search: http://zoekt-b:6090)"));
}

#[test]
fn test_nodes_empty() {
    let home = TempDir::new().unwrap();
    dispatch(&home)
        .arg("nodes")
        .assert()
        .success()
        .stderr(predicate::str::contains("No nodes configured"));
}
