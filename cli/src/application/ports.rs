//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared record schema,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use turboship_common::{Application, Progress};

use crate::domain::application::AppSpec;
use crate::domain::config::TurboshipConfig;
use crate::domain::error::{LifecycleError, ProvisionError};

// ── Registry Port ─────────────────────────────────────────────────────────────

/// Durable table of provisioned applications, keyed by name.
///
/// Implementations must make each call atomic with respect to the others.
/// Typed failures are `LifecycleError::DuplicateKey` and
/// `LifecycleError::NotFound`, carried inside `anyhow::Error`.
#[allow(async_fn_in_trait)]
pub trait RegistryStore {
    /// Insert a new row. Fails with `DuplicateKey` if the name or the port is
    /// already present.
    async fn insert(&self, app: &Application) -> Result<()>;
    /// Look up a row, returning `None` when absent.
    async fn find(&self, name: &str) -> Result<Option<Application>>;
    /// Set or clear `real_domain`. Fails with `NotFound` if absent.
    async fn update_domain(&self, name: &str, real_domain: Option<&str>) -> Result<()>;
    /// Record provisioning progress. Fails with `NotFound` if absent.
    async fn update_progress(&self, name: &str, progress: &Progress) -> Result<()>;
    /// Remove a row. Fails with `NotFound` if absent.
    async fn delete(&self, name: &str) -> Result<()>;
    /// All rows in unspecified order.
    async fn list_all(&self) -> Result<Vec<Application>>;

    /// Look up a row, failing with `NotFound` when absent.
    async fn get(&self, name: &str) -> Result<Application> {
        self.find(name)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(name.to_string()).into())
    }
}

// ── Allocation Lock Port ──────────────────────────────────────────────────────

/// Named mutual-exclusion lock serializing registry read-then-write sequences
/// across independent processes. Released when the guard is dropped.
#[allow(async_fn_in_trait)]
pub trait AllocationLock {
    type Guard;

    /// Acquire the lock. Fails with `LifecycleError::LockUnavailable` when
    /// another holder does not release it in time.
    async fn acquire(&self) -> Result<Self::Guard>;
}

// ── Resource Provisioner Port ─────────────────────────────────────────────────

/// Adapter for one external system (identity, database, route, certificate).
///
/// Both operations must be idempotent: the orchestrator re-runs them after
/// partial failures.
#[allow(async_fn_in_trait)]
pub trait ResourceProvisioner {
    /// Bring the external resource in line with `spec`.
    async fn ensure(&self, spec: &AppSpec) -> Result<(), ProvisionError>;
    /// Remove the external resource; absence is success.
    async fn release(&self, spec: &AppSpec) -> Result<(), ProvisionError>;
}

/// The four adapters, invoked by the orchestrator in a fixed order.
pub struct Provisioners<I, D, R, C> {
    pub identity: I,
    pub database: D,
    pub route: R,
    pub certificate: C,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Run a program with extra environment variables.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output>;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Abstracts the handful of filesystem operations adapters perform directly.
pub trait LocalFs {
    /// `true` if `path` exists. Symlinks are not followed, so a dangling link
    /// counts as existing.
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    /// Create `link` pointing at `target`.
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;
}

// ── Network Ports ─────────────────────────────────────────────────────────────

/// Resolves the server's public address for sslip.io hostnames.
#[allow(async_fn_in_trait)]
pub trait PublicIpResolver {
    async fn public_ip(&self) -> Result<IpAddr>;
}

/// Abstracts network connectivity checks so application services can be tested
/// without real network access.
#[allow(async_fn_in_trait)]
pub trait NetworkProbe {
    /// Check TCP connectivity to the given host and port.
    async fn check_tcp_connectivity(&self, host: &str, port: u16) -> Result<bool>;
    /// Addresses `hostname` resolves to. Empty when it does not resolve.
    async fn resolve_host(&self, hostname: &str) -> Result<Vec<IpAddr>>;
}

/// Verifies an application's database credentials.
#[allow(async_fn_in_trait)]
pub trait DatabaseProbe {
    /// Log in as the application's database account. `Err` carries the
    /// client's complaint.
    async fn check_login(&self, spec: &AppSpec) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Loads host configuration.
pub trait ConfigStore {
    /// Load and validate configuration; a missing file yields defaults.
    fn load(&self) -> Result<TurboshipConfig>;
    /// Location the configuration is read from.
    fn path(&self) -> PathBuf;
}
