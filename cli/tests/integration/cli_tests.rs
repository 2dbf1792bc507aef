//! Integration tests for argument parsing, validation and error output.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A scratch host: config file plus registry and lock locations.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "registry_path: {registry}\nlegacy_db_path: {legacy}\nlock_path: {lock}\npublic_ip: 203.0.113.7\ntimeouts:\n  lock_wait_secs: 1\n",
            registry = dir.path().join("registry.json").display(),
            legacy = dir.path().join("turboship.db").display(),
            lock = dir.path().join("turboship.lock").display(),
        );
        std::fs::write(dir.path().join("config.yaml"), config).unwrap();
        Self { dir }
    }

    pub fn registry(&self) -> PathBuf {
        self.dir.path().join("registry.json")
    }

    pub fn legacy_db(&self) -> PathBuf {
        self.dir.path().join("turboship.db")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("turboship"));
        cmd.env("NO_COLOR", "1")
            .env("TURBOSHIP_CONFIG", self.dir.path().join("config.yaml"))
            .env_remove("RUST_LOG");
        cmd
    }
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    Sandbox::new().cmd().assert().code(2).stderr(predicate::str::contains(
        "Provision isolated hosted-application environments",
    ));
}

#[test]
fn test_cli_help_lists_every_command() {
    let assert = Sandbox::new().cmd().arg("--help").assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    for command in [
        "create",
        "delete",
        "list",
        "info",
        "test",
        "map-domain",
        "repair",
        "install-ssl",
        "config",
    ] {
        assert!(out.contains(command), "help is missing {command}:\n{out}");
    }
}

#[test]
fn test_cli_version_flag_shows_version() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("turboship"));
}

#[test]
fn test_unknown_db_type_is_usage_error() {
    Sandbox::new()
        .cmd()
        .args(["create", "acme", "--db", "oracle"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("oracle"));
}

// --- Validation happens before any side effect ---

#[test]
fn test_create_invalid_name_fails_without_touching_registry() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["create", "bad name!", "--db", "mariadb", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid input"));
    assert!(!sandbox.registry().exists());
}

#[test]
fn test_create_without_db_in_non_interactive_mode() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["create", "acme", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--db is required"));
    assert!(!sandbox.registry().exists());
}

#[test]
fn test_map_domain_rejects_malformed_domain() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["map-domain", "acme", "--domain", "not a host"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a valid hostname"));
    assert!(!sandbox.registry().exists());
}

// --- Read-only commands on an empty registry ---

#[test]
fn test_list_empty_registry() {
    Sandbox::new()
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No applications"));
}

#[test]
fn test_list_json_empty_registry_is_empty_array() {
    let assert = Sandbox::new().cmd().args(["list", "--json"]).assert().success();
    let v: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(v, serde_json::json!([]));
}

#[test]
fn test_info_unknown_app_is_not_found() {
    Sandbox::new()
        .cmd()
        .args(["info", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Application 'ghost' not found."));
}

#[test]
fn test_json_error_object_on_stdout() {
    let assert = Sandbox::new()
        .cmd()
        .args(["info", "ghost", "--json"])
        .assert()
        .code(1);
    let v: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(v["error"], true);
    assert_eq!(v["code"], "not_found");
}

#[test]
fn test_delete_unknown_app_is_not_found() {
    Sandbox::new()
        .cmd()
        .args(["delete", "ghost", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

// --- Import of the SQLite registry through the binary ---

#[test]
fn test_info_reads_legacy_sqlite_registry() {
    let sandbox = Sandbox::new();
    let conn = rusqlite::Connection::open(sandbox.legacy_db()).unwrap();
    conn.execute_batch(
        "CREATE TABLE apps (app TEXT PRIMARY KEY, temp_domain TEXT, real_domain TEXT,
             db_type TEXT, db_name TEXT, db_user TEXT, db_pass TEXT, sftp_user TEXT,
             sftp_pass TEXT, created_at TEXT);
         INSERT INTO apps VALUES ('legacy', 'legacy.203.0.113.7.sslip.io', NULL, 'mariadb',
             'legacy_db', 'legacy_dbu', 'pw', 'legacy_sftp', 'pw', '2024-05-01T12:00:00');",
    )
    .unwrap();
    drop(conn);

    let assert = sandbox.cmd().args(["info", "legacy", "--json"]).assert().success();
    let v: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(v["port"], 3000);
    assert_eq!(v["state"], "active");
    assert_eq!(v["identity_user"], "legacy_sftp");
    assert!(!sandbox.registry().exists());
}
