//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;
use turboship_common::{ProvisionState, Subsystem};

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Failure reported by one resource adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("{subsystem}: {cause}")]
    Failed { subsystem: Subsystem, cause: String },

    #[error("{subsystem}: configuration rejected by validation, previous configuration kept: {detail}")]
    ConfigInvalid { subsystem: Subsystem, detail: String },

    #[error("{subsystem}: timed out after {secs}s")]
    TimedOut { subsystem: Subsystem, secs: u64 },
}

impl ProvisionError {
    #[must_use]
    pub fn failed(subsystem: Subsystem, cause: impl Into<String>) -> Self {
        ProvisionError::Failed {
            subsystem,
            cause: cause.into(),
        }
    }

    #[must_use]
    pub fn subsystem(&self) -> Subsystem {
        match self {
            ProvisionError::Failed { subsystem, .. }
            | ProvisionError::ConfigInvalid { subsystem, .. }
            | ProvisionError::TimedOut { subsystem, .. } => *subsystem,
        }
    }
}

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Errors surfaced by lifecycle operations (create, delete, map-domain, ...).
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Registry already holds {key}")]
    DuplicateKey { key: String },

    #[error("Application '{0}' not found.")]
    NotFound(String),

    #[error("Application '{0}' already exists. Use 'turboship map-domain' to change its domain.")]
    AlreadyExists(String),

    #[error(
        "Application '{0}' is being torn down. Run 'turboship delete {0}' to finish removing it."
    )]
    TeardownPending(String),

    #[error(
        "{subsystem} provisioning failed for '{app}': {source}\n\
         The application is left partially provisioned (furthest state: {furthest}); \
         its registry entry and port are kept.\n\
         Resume with 'turboship create {app}' or 'turboship repair {app}', \
         or remove it with 'turboship delete {app}'."
    )]
    Provision {
        app: String,
        subsystem: Subsystem,
        furthest: ProvisionState,
        #[source]
        source: ProvisionError,
    },

    #[error(
        "certificate issuance failed for '{app}': {source}\n\
         The application keeps serving without TLS. Retry with 'turboship install-ssl {app}'."
    )]
    Certificate {
        app: String,
        #[source]
        source: ProvisionError,
    },

    #[error("No free port between {base} and {max}. Raise ports.max in the configuration.")]
    AllocationExhausted { base: u16, max: u16 },

    #[error("Another turboship operation holds the lock at {path}. Try again when it finishes.")]
    LockUnavailable { path: String },
}

impl LifecycleError {
    /// Stable machine-readable code used by `--json` error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation_error",
            LifecycleError::DuplicateKey { .. } => "duplicate_key",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::AlreadyExists(_) => "already_exists",
            LifecycleError::TeardownPending(_) => "teardown_pending",
            LifecycleError::Provision { .. } => "provision_error",
            LifecycleError::Certificate { .. } => "certificate_error",
            LifecycleError::AllocationExhausted { .. } => "allocation_exhausted",
            LifecycleError::LockUnavailable { .. } => "lock_unavailable",
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port range: base {base} must be >= 1024 and <= max {max}")]
    PortRange { base: u16, max: u16 },

    #[error("Invalid secret_length {0}: must be between 8 and 128")]
    SecretLength(usize),

    #[error("Invalid value for {key}: {detail}")]
    InvalidValue { key: String, detail: String },
}
