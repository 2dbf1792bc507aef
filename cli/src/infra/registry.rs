//! Infrastructure implementation of the `RegistryStore` port.
//!
//! `JsonRegistryStore` keeps every row in one JSON document. Each call runs in
//! `spawn_blocking` as a read-modify-write of the whole file, finished by an
//! atomic rename so a crash never leaves a torn registry behind.
//!
//! Until the JSON file exists, rows are read from the SQLite registry of
//! earlier releases when one is configured; the first mutation writes them
//! out as JSON.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use turboship_common::{Application, Progress};

use crate::application::ports::RegistryStore;
use crate::domain::allocation::PortRange;
use crate::domain::error::LifecycleError;
use crate::infra::legacy;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct RegistryFile {
    schema_version: u32,
    apps: Vec<Application>,
}

/// SQLite registry to import from while the JSON file is absent.
#[derive(Debug, Clone)]
struct LegacySource {
    db_path: PathBuf,
    ports: PortRange,
}

/// Registry backed by a JSON file (default `/opt/turboship/registry.json`).
pub struct JsonRegistryStore {
    path: PathBuf,
    legacy: Option<LegacySource>,
    gate: Arc<Mutex<()>>,
}

impl JsonRegistryStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            legacy: None,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Import from the SQLite registry at `db_path` while the JSON file does
    /// not exist, handing out ports from `ports`.
    #[must_use]
    pub fn with_legacy_import(mut self, db_path: PathBuf, ports: PortRange) -> Self {
        self.legacy = Some(LegacySource { db_path, ports });
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on the blocking pool while holding the in-process gate.
    async fn with_file<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path, Option<&LegacySource>) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let legacy = self.legacy.clone();
        let gate = Arc::clone(&self.gate);
        tokio::task::spawn_blocking(move || {
            let _held = gate
                .lock()
                .map_err(|_| anyhow::anyhow!("registry gate poisoned"))?;
            f(&path, legacy.as_ref())
        })
        .await
        .context("registry task panicked")?
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Vec<Application>) -> T + Send + 'static,
    {
        self.with_file(move |path, legacy| Ok(f(read_rows(path, legacy)?)))
            .await
    }

    /// Load, apply `mutate`, and save.
    async fn modify<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Application>) -> Result<()> + Send + 'static,
    {
        self.with_file(move |path, legacy| {
            let mut apps = read_rows(path, legacy)?;
            mutate(&mut apps)?;
            save_rows(path, &apps)
        })
        .await
    }
}

fn read_rows(path: &Path, legacy: Option<&LegacySource>) -> Result<Vec<Application>> {
    match legacy {
        Some(src) if !path.exists() && src.db_path.exists() => {
            legacy::import_sqlite(&src.db_path, src.ports)
        }
        _ => load_rows(path),
    }
}

/// Read every row. A missing file is an empty registry.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, carries no
/// `schema_version`, or was written by a newer schema.
pub fn load_rows(path: &Path) -> Result<Vec<Application>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading registry {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing registry {}", path.display()))?;

    match value.get("schema_version").and_then(serde_json::Value::as_u64) {
        Some(v) if v == u64::from(SCHEMA_VERSION) => {
            let file: RegistryFile = serde_json::from_value(value)
                .with_context(|| format!("parsing registry {}", path.display()))?;
            Ok(file.apps)
        }
        Some(v) => anyhow::bail!(
            "registry {} has schema version {v}; this turboship understands version {SCHEMA_VERSION}",
            path.display()
        ),
        None => anyhow::bail!(
            "registry {} has no schema_version; it was not written by turboship",
            path.display()
        ),
    }
}

/// Write every row at the current schema version, atomically, mode 0600.
///
/// # Errors
///
/// Returns an error if the directory or temp file cannot be created or the
/// final rename fails.
pub fn save_rows(path: &Path, apps: &[Application]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;

    let file = RegistryFile {
        schema_version: SCHEMA_VERSION,
        apps: apps.to_vec(),
    };
    let content = serde_json::to_string_pretty(&file).context("serializing registry")?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .context("writing registry temp file")?;
    tmp.as_file().sync_all().context("syncing registry temp file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", tmp.path().display()))?;
    }

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("finalizing registry {}", path.display()))?;
    Ok(())
}

fn position(apps: &[Application], name: &str) -> Result<usize, LifecycleError> {
    apps.iter()
        .position(|a| a.name == name)
        .ok_or_else(|| LifecycleError::NotFound(name.to_string()))
}

impl RegistryStore for JsonRegistryStore {
    async fn insert(&self, app: &Application) -> Result<()> {
        let app = app.clone();
        self.modify(move |apps| {
            if apps.iter().any(|a| a.name == app.name) {
                return Err(LifecycleError::DuplicateKey {
                    key: format!("name '{}'", app.name),
                }
                .into());
            }
            if apps.iter().any(|a| a.port == app.port) {
                return Err(LifecycleError::DuplicateKey {
                    key: format!("port {}", app.port),
                }
                .into());
            }
            apps.push(app);
            Ok(())
        })
        .await
    }

    async fn find(&self, name: &str) -> Result<Option<Application>> {
        let name = name.to_string();
        self.read(move |apps| apps.into_iter().find(|a| a.name == name))
            .await
    }

    async fn update_domain(&self, name: &str, real_domain: Option<&str>) -> Result<()> {
        let name = name.to_string();
        let real_domain = real_domain.map(str::to_string);
        self.modify(move |apps| {
            let i = position(apps, &name)?;
            apps[i].real_domain = real_domain;
            Ok(())
        })
        .await
    }

    async fn update_progress(&self, name: &str, progress: &Progress) -> Result<()> {
        let name = name.to_string();
        let progress = progress.clone();
        self.modify(move |apps| {
            let i = position(apps, &name)?;
            apps[i].progress = progress;
            Ok(())
        })
        .await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.modify(move |apps| {
            let i = position(apps, &name)?;
            apps.remove(i);
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<Application>> {
        self.read(|apps| apps).await
    }
}
