use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Database engine family backing an application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MariaDB / MySQL.
    #[cfg_attr(feature = "clap", value(name = "mariadb", alias = "mysql"))]
    Mariadb,
    /// PostgreSQL.
    #[cfg_attr(feature = "clap", value(name = "postgres", alias = "postgresql"))]
    Postgres,
}

impl DbType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DbType::Mariadb => "mariadb",
            DbType::Postgres => "postgres",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown database type '{0}' (expected mariadb or postgres)")]
pub struct ParseDbTypeError(String);

impl FromStr for DbType {
    type Err = ParseDbTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mariadb" | "mysql" | "1" => Ok(DbType::Mariadb),
            "postgres" | "postgresql" | "2" => Ok(DbType::Postgres),
            other => Err(ParseDbTypeError(other.to_string())),
        }
    }
}

/// Furthest provisioning state an application has reached.
///
/// Declaration order is the order of the provisioning sequence, so the derived
/// `Ord` answers "has this step completed?".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisionState {
    Requested,
    PortAllocated,
    IdentityReady,
    DatabaseReady,
    RouteReady,
    Secured,
    Active,
    TearingDown,
}

impl ProvisionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProvisionState::Requested => "requested",
            ProvisionState::PortAllocated => "port-allocated",
            ProvisionState::IdentityReady => "identity-ready",
            ProvisionState::DatabaseReady => "database-ready",
            ProvisionState::RouteReady => "route-ready",
            ProvisionState::Secured => "secured",
            ProvisionState::Active => "active",
            ProvisionState::TearingDown => "tearing-down",
        }
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External system touched by a provisioning step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Identity,
    Database,
    Route,
    Certificate,
}

impl Subsystem {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subsystem::Identity => "identity",
            Subsystem::Database => "database",
            Subsystem::Route => "route",
            Subsystem::Certificate => "certificate",
        }
    }

    /// State reached once this subsystem's `ensure` has succeeded.
    #[must_use]
    pub fn ready_state(self) -> ProvisionState {
        match self {
            Subsystem::Identity => ProvisionState::IdentityReady,
            Subsystem::Database => ProvisionState::DatabaseReady,
            Subsystem::Route => ProvisionState::RouteReady,
            Subsystem::Certificate => ProvisionState::Secured,
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last hard failure recorded against an application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepFailure {
    pub subsystem: Subsystem,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Mutable provisioning progress of a registry row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub state: ProvisionState,
    #[serde(default)]
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

/// One provisioned (or partially provisioned) hosted application.
///
/// `name` is the primary key. Every other identifier is derived from it at
/// creation time and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub identity_user: String,
    pub identity_password: String,
    pub db_type: DbType,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub temp_domain: String,
    #[serde(default)]
    pub real_domain: Option<String>,
    pub port: u16,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub progress: Progress,
}

impl Application {
    /// Hostnames currently bound to the application, temp domain first.
    #[must_use]
    pub fn domains(&self) -> Vec<String> {
        let mut domains = vec![self.temp_domain.clone()];
        if let Some(real) = &self.real_domain
            && real != &self.temp_domain
        {
            domains.push(real.clone());
        }
        domains
    }

    /// `true` once every mandatory step has completed and nothing failed since.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.progress.state == ProvisionState::Active && self.progress.failure.is_none()
    }
}
