//! Tests for `YamlConfigStore`.
//!
//! These tests mutate `TURBOSHIP_CONFIG` and are serialized with
//! `serial_test`.

#![allow(clippy::expect_used, clippy::unwrap_used, unsafe_code)]

use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;
use turboship_cli::application::ports::ConfigStore;
use turboship_cli::domain::error::ConfigError;
use turboship_cli::infra::config::{CONFIG_ENV, DEFAULT_CONFIG_PATH, YamlConfigStore};

fn point_at(path: &Path) {
    // SAFETY: every test touching TURBOSHIP_CONFIG is #[serial].
    unsafe { std::env::set_var(CONFIG_ENV, path) };
}

fn reset() {
    // SAFETY: see `point_at`.
    unsafe { std::env::remove_var(CONFIG_ENV) };
}

#[test]
#[serial]
fn default_path_without_env() {
    reset();
    assert_eq!(YamlConfigStore.path(), PathBuf::from(DEFAULT_CONFIG_PATH));
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.yaml");
    point_at(&path);

    let config = YamlConfigStore.load().unwrap();
    assert_eq!(YamlConfigStore.path(), path);
    assert_eq!(config.ports.base, 3000);
    assert_eq!(config.ports.max, 3999);
    assert_eq!(config.www_root, PathBuf::from("/var/www"));
    reset();
}

#[test]
#[serial]
fn partial_file_overrides_only_given_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "ports:\n  base: 4000\n  max: 4010\npublic_ip: 198.51.100.4\nacme:\n  staging: true\n",
    )
    .unwrap();
    point_at(&path);

    let config = YamlConfigStore.load().unwrap();
    assert_eq!(config.ports.base, 4000);
    assert_eq!(config.ports.max, 4010);
    assert_eq!(config.public_ip, Some("198.51.100.4".parse().unwrap()));
    assert!(config.acme.staging);
    assert_eq!(config.acme.retries, 1);
    assert_eq!(config.web_group, "www-data");
    reset();
}

#[test]
#[serial]
fn inverted_port_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "ports:\n  base: 5000\n  max: 4000\n").unwrap();
    point_at(&path);

    let err = YamlConfigStore.load().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::PortRange { base: 5000, max: 4000 })
    ));
    assert!(format!("{err:#}").contains("invalid configuration"));
    reset();
}

#[test]
#[serial]
fn malformed_yaml_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "ports: [unterminated\n").unwrap();
    point_at(&path);

    let err = YamlConfigStore.load().unwrap_err();
    assert!(err.to_string().contains("config.yaml"));
    reset();
}
