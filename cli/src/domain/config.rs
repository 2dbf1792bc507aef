//! Domain types and validators for turboship host configuration.
//!
//! Pure functions only, no I/O, no async, no filesystem access.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::allocation::PortRange;
use crate::domain::error::ConfigError;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `/etc/turboship/config.yaml`.
///
/// Every field has a default, so a missing or partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboshipConfig {
    /// Registry file, the source of truth for provisioned applications.
    pub registry_path: PathBuf,
    /// SQLite registry of releases before the JSON file, imported while
    /// `registry_path` does not exist. `null` disables the import.
    pub legacy_db_path: Option<PathBuf>,
    /// Advisory lock file serializing lifecycle operations.
    pub lock_path: PathBuf,
    pub ports: PortsConfig,
    /// Parent directory of every application's home directory.
    pub www_root: PathBuf,
    /// Group the web server runs as; owns static roots and logs.
    pub web_group: String,
    pub identity: IdentityConfig,
    pub nginx: NginxConfig,
    pub acme: AcmeConfig,
    pub database: DatabaseConfig,
    /// Public address used for sslip.io hostnames. Looked up when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<IpAddr>,
    /// Endpoint returning the caller's public address as plain text.
    pub ip_lookup_url: String,
    pub secret_length: usize,
    pub timeouts: TimeoutsConfig,
}

impl Default for TurboshipConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from("/opt/turboship/registry.json"),
            legacy_db_path: Some(PathBuf::from("/opt/turboship/turboship.db")),
            lock_path: PathBuf::from("/opt/turboship/turboship.lock"),
            ports: PortsConfig::default(),
            www_root: PathBuf::from("/var/www"),
            web_group: "www-data".to_string(),
            identity: IdentityConfig::default(),
            nginx: NginxConfig::default(),
            acme: AcmeConfig::default(),
            database: DatabaseConfig::default(),
            public_ip: None,
            ip_lookup_url: "https://ifconfig.me/ip".to_string(),
            secret_length: 16,
            timeouts: TimeoutsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    pub base: u16,
    pub max: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            base: 3000,
            max: 3999,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Login shell for file-transfer accounts.
    pub shell: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            shell: "/usr/sbin/nologin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NginxConfig {
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmeConfig {
    /// Registration email. Defaults to `admin@<first domain>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Extra issuance attempts after the first failure.
    pub retries: u32,
    /// Use the ACME staging environment.
    pub staging: bool,
    /// Directory holding one sub-directory per certificate lineage.
    pub live_dir: PathBuf,
}

impl Default for AcmeConfig {
    fn default() -> Self {
        Self {
            email: None,
            retries: 1,
            staging: false,
            live_dir: PathBuf::from("/etc/letsencrypt/live"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// MariaDB client binary, run as root over the local socket.
    pub mariadb_client: String,
    /// OS account owning the PostgreSQL cluster.
    pub postgres_superuser: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mariadb_client: "mysql".to_string(),
            postgres_superuser: "postgres".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Per external command.
    pub command_secs: u64,
    /// Per adapter `ensure`/`release` call.
    pub adapter_secs: u64,
    /// Waiting for the allocation lock.
    pub lock_wait_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            command_secs: 120,
            adapter_secs: 600,
            lock_wait_secs: 15,
        }
    }
}

impl TurboshipConfig {
    #[must_use]
    pub fn port_range(&self) -> PortRange {
        PortRange {
            base: self.ports.base,
            max: self.ports.max,
        }
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.command_secs)
    }

    #[must_use]
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.adapter_secs)
    }

    #[must_use]
    pub fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.timeouts.lock_wait_secs)
    }

    /// Validates cross-field constraints after deserialization.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ports.base < 1024 || self.ports.base > self.ports.max {
            return Err(ConfigError::PortRange {
                base: self.ports.base,
                max: self.ports.max,
            });
        }
        if !(8..=128).contains(&self.secret_length) {
            return Err(ConfigError::SecretLength(self.secret_length));
        }
        if self.web_group.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "web_group".to_string(),
                detail: "must not be empty".to_string(),
            });
        }
        if !self.www_root.is_absolute() {
            return Err(ConfigError::InvalidValue {
                key: "www_root".to_string(),
                detail: format!("'{}' must be an absolute path", self.www_root.display()),
            });
        }
        Ok(())
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
