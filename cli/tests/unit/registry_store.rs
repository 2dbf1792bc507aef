//! Tests for the JSON registry store: persistence, key rules, and import
//! from the SQLite registry of earlier releases.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use tempfile::TempDir;
use turboship_cli::application::ports::RegistryStore;
use turboship_cli::domain::allocation::PortRange;
use turboship_cli::domain::error::LifecycleError;
use turboship_cli::infra::registry::{JsonRegistryStore, SCHEMA_VERSION, load_rows, save_rows};
use turboship_common::{DbType, ProvisionState, Subsystem};

use crate::helpers::{active_app, partial_app};

fn store() -> (TempDir, JsonRegistryStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.json");
    (dir, JsonRegistryStore::new(path))
}

fn registry_path(dir: &TempDir) -> PathBuf {
    dir.path().join("registry.json")
}

#[tokio::test]
async fn missing_file_is_empty_registry() {
    let (_dir, store) = store();
    assert!(store.list_all().await.unwrap().is_empty());
    assert!(store.find("acme").await.unwrap().is_none());
}

#[tokio::test]
async fn insert_persists_across_instances() {
    let (dir, store) = store();
    store.insert(&active_app("acme", 3000)).await.unwrap();

    let reopened = JsonRegistryStore::new(registry_path(&dir));
    let row = reopened.get("acme").await.unwrap();
    assert_eq!(row.port, 3000);
    assert_eq!(row.identity_user, "acme_sftp");
}

#[tokio::test]
async fn file_carries_schema_version() {
    let (dir, store) = store();
    store.insert(&active_app("acme", 3000)).await.unwrap();
    let text = std::fs::read_to_string(registry_path(&dir)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["schema_version"], SCHEMA_VERSION);
    assert_eq!(value["apps"][0]["name"], "acme");
    assert_eq!(value["apps"][0]["state"], "active");
}

#[cfg(unix)]
#[tokio::test]
async fn file_is_private_to_owner() {
    use std::os::unix::fs::PermissionsExt;
    let (dir, store) = store();
    store.insert(&active_app("acme", 3000)).await.unwrap();
    let mode = std::fs::metadata(registry_path(&dir)).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn duplicate_name_is_rejected() {
    let (_dir, store) = store();
    store.insert(&active_app("acme", 3000)).await.unwrap();
    let err = store.insert(&active_app("acme", 3001)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LifecycleError>(),
        Some(LifecycleError::DuplicateKey { key }) if key.contains("acme")
    ));
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_port_is_rejected() {
    let (_dir, store) = store();
    store.insert(&active_app("acme", 3000)).await.unwrap();
    let err = store.insert(&active_app("other", 3000)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LifecycleError>(),
        Some(LifecycleError::DuplicateKey { key }) if key == "port 3000"
    ));
}

#[tokio::test]
async fn updates_on_missing_rows_are_not_found() {
    let (_dir, store) = store();
    let progress = partial_app("x", 3000, ProvisionState::RouteReady).progress;
    for err in [
        store.update_domain("ghost", Some("a.example.com")).await.unwrap_err(),
        store.update_progress("ghost", &progress).await.unwrap_err(),
        store.delete("ghost").await.unwrap_err(),
        store.get("ghost").await.unwrap_err(),
    ] {
        assert!(matches!(
            err.downcast_ref::<LifecycleError>(),
            Some(LifecycleError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn progress_and_domain_updates_round_trip() {
    let (_dir, store) = store();
    store
        .insert(&partial_app("acme", 3000, ProvisionState::PortAllocated))
        .await
        .unwrap();

    let mut progress = partial_app("acme", 3000, ProvisionState::IdentityReady).progress;
    progress.failure = Some(turboship_common::StepFailure {
        subsystem: Subsystem::Database,
        message: "access denied".into(),
        at: chrono::Utc::now(),
    });
    store.update_progress("acme", &progress).await.unwrap();
    store.update_domain("acme", Some("acme.example.com")).await.unwrap();

    let row = store.get("acme").await.unwrap();
    assert_eq!(row.progress, progress);
    assert_eq!(row.real_domain.as_deref(), Some("acme.example.com"));

    store.update_domain("acme", None).await.unwrap();
    assert!(store.get("acme").await.unwrap().real_domain.is_none());
}

#[tokio::test]
async fn delete_removes_only_that_row() {
    let (_dir, store) = store();
    store.insert(&active_app("acme", 3000)).await.unwrap();
    store.insert(&active_app("beta", 3001)).await.unwrap();
    store.delete("acme").await.unwrap();
    let names: Vec<_> = store.list_all().await.unwrap().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["beta"]);
}

#[tokio::test]
async fn concurrent_inserts_are_serialized() {
    let (_dir, store) = store();
    let store = std::sync::Arc::new(store);
    let mut tasks = Vec::new();
    for i in 0..8u16 {
        let store = std::sync::Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store.insert(&active_app(&format!("app{i}"), 3000 + i)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(store.list_all().await.unwrap().len(), 8);
}

// ── Import from the SQLite registry ──────────────────────────────────────────

const PORTS: PortRange = PortRange { base: 3000, max: 3999 };

/// An `apps` table laid out the way turboship 0.7 created it.
fn legacy_db(dir: &TempDir, rows: &[[Option<&str>; 10]]) -> PathBuf {
    let path = dir.path().join("turboship.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE apps (
            app TEXT PRIMARY KEY, temp_domain TEXT, real_domain TEXT, db_type TEXT,
            db_name TEXT, db_user TEXT, db_pass TEXT, sftp_user TEXT, sftp_pass TEXT,
            created_at TEXT
        )",
    )
    .unwrap();
    for row in rows {
        conn.execute(
            "INSERT INTO apps VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params_from_iter(row.iter()),
        )
        .unwrap();
    }
    path
}

const BETA: [Option<&str>; 10] = [
    Some("beta"),
    Some("beta.203.0.113.7.sslip.io"),
    None,
    Some("postgres"),
    Some("beta_db"),
    Some("beta_dbu"),
    Some("dbpass"),
    Some("beta_sftp"),
    Some("sftppass"),
    Some("2024-05-01T12:34:56.789012"),
];

const ALPHA: [Option<&str>; 10] = [
    Some("alpha"),
    Some("alpha.203.0.113.7.sslip.io"),
    Some("alpha.example.com"),
    Some("mariadb"),
    Some("alpha_db"),
    Some("alpha_dbu"),
    Some("pw1"),
    Some("alpha_sftp"),
    Some("pw2"),
    None,
];

fn importing_store(dir: &TempDir, db: PathBuf) -> JsonRegistryStore {
    JsonRegistryStore::new(registry_path(dir)).with_legacy_import(db, PORTS)
}

#[tokio::test]
async fn legacy_rows_are_imported_in_name_order() {
    let dir = TempDir::new().unwrap();
    let db = legacy_db(&dir, &[BETA, ALPHA]);
    let rows = importing_store(&dir, db).list_all().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].name.as_str(), rows[0].port), ("alpha", 3000));
    assert_eq!((rows[1].name.as_str(), rows[1].port), ("beta", 3001));
    assert!(rows.iter().all(turboship_common::Application::is_active));

    let beta = &rows[1];
    assert_eq!(beta.db_type, DbType::Postgres);
    assert_eq!(beta.db_password, "dbpass");
    assert_eq!(beta.identity_user, "beta_sftp");
    assert_eq!(beta.identity_password, "sftppass");
    assert_eq!(beta.created_at.to_rfc3339(), "2024-05-01T12:34:56.789012+00:00");
    assert_eq!(rows[0].real_domain.as_deref(), Some("alpha.example.com"));
    assert!(!registry_path(&dir).exists(), "reads must not write");
}

#[tokio::test]
async fn first_write_persists_imported_rows() {
    let dir = TempDir::new().unwrap();
    let db = legacy_db(&dir, &[ALPHA]);
    let store = importing_store(&dir, db.clone());
    store.insert(&active_app("gamma", 3001)).await.unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(registry_path(&dir)).unwrap()).unwrap();
    assert_eq!(value["schema_version"], SCHEMA_VERSION);
    assert_eq!(value["apps"].as_array().unwrap().len(), 2);

    // Later reads come from JSON, so a row deleted there stays deleted.
    store.delete("alpha").await.unwrap();
    let names: Vec<_> = store.list_all().await.unwrap().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["gamma"]);
    assert!(db.exists());
}

#[tokio::test]
async fn imported_port_cannot_be_claimed_twice() {
    let dir = TempDir::new().unwrap();
    let db = legacy_db(&dir, &[ALPHA]);
    let store = importing_store(&dir, db);
    let err = store.insert(&active_app("gamma", 3000)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LifecycleError>(),
        Some(LifecycleError::DuplicateKey { key }) if key == "port 3000"
    ));
}

#[tokio::test]
async fn missing_legacy_database_is_empty_registry() {
    let dir = TempDir::new().unwrap();
    let store = importing_store(&dir, dir.path().join("absent.db"));
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_legacy_engine_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut row = ALPHA;
    row[3] = Some("oracle");
    let db = legacy_db(&dir, &[row]);
    let err = importing_store(&dir, db).list_all().await.unwrap_err();
    let text = format!("{err:#}");
    assert!(text.contains("alpha") && text.contains("oracle"), "{text}");
}

#[test]
fn file_without_schema_version_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = registry_path(&dir);
    std::fs::write(&path, r#"[{"name": "alpha"}]"#).unwrap();
    let err = load_rows(&path).unwrap_err();
    assert!(err.to_string().contains("no schema_version"));
}

#[test]
fn newer_schema_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = registry_path(&dir);
    std::fs::write(&path, r#"{"schema_version": 99, "apps": []}"#).unwrap();
    let err = load_rows(&path).unwrap_err();
    assert!(err.to_string().contains("schema version 99"));
}

#[test]
fn corrupt_file_is_an_error_not_an_empty_registry() {
    let dir = TempDir::new().unwrap();
    let path = registry_path(&dir);
    std::fs::write(&path, "{ not json").unwrap();
    assert!(load_rows(&path).is_err());
}

#[test]
fn save_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("registry.json");
    save_rows(&path, &[active_app("acme", 3000)]).unwrap();
    assert_eq!(load_rows(&path).unwrap().len(), 1);
}
