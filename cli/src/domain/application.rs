//! Application naming rules and the resource spec handed to adapters.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use turboship_common::{Application, DbType};

use crate::domain::error::LifecycleError;

/// Longest accepted application name.
///
/// `useradd` caps account names at 32 characters and `<name>_sftp` adds five.
pub const MAX_NAME_LEN: usize = 27;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("static regex")
});

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("static regex")
});

/// Validates an application name.
///
/// Accepted names match `[A-Za-z0-9_-]+`, start with a letter or digit, and
/// are at most [`MAX_NAME_LEN`] characters long.
///
/// # Errors
///
/// Returns `LifecycleError::Validation` describing the rule that was broken.
pub fn validate_app_name(name: &str) -> Result<(), LifecycleError> {
    if name.is_empty() {
        return Err(LifecycleError::Validation(
            "application name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(LifecycleError::Validation(format!(
            "application name '{name}' is longer than {MAX_NAME_LEN} characters"
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(LifecycleError::Validation(format!(
            "application name '{name}' may only contain letters, digits, '-' and '_', \
             and must start with a letter or digit"
        )));
    }
    Ok(())
}

/// Validates a public hostname and returns it lowercased.
///
/// # Errors
///
/// Returns `LifecycleError::Validation` if the hostname is malformed.
pub fn normalize_domain(domain: &str) -> Result<String, LifecycleError> {
    let lowered = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    let invalid = || LifecycleError::Validation(format!("'{domain}' is not a valid hostname"));
    if lowered.is_empty() || lowered.len() > 253 {
        return Err(invalid());
    }
    let labels: Vec<&str> = lowered.split('.').collect();
    if labels.len() < 2 || !labels.iter().all(|l| LABEL_RE.is_match(l)) {
        return Err(invalid());
    }
    Ok(lowered)
}

// ── Resource spec ─────────────────────────────────────────────────────────────

/// Everything an adapter needs to ensure or release one application's
/// resources. Built from a registry row plus host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    pub name: String,
    pub identity_user: String,
    pub identity_password: String,
    pub home_dir: PathBuf,
    pub db_type: DbType,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    /// Hostnames to route and certify, temp domain first.
    pub domains: Vec<String>,
    pub port: u16,
    /// Whether the route should reference the application's certificate.
    pub tls: bool,
}

impl AppSpec {
    #[must_use]
    pub fn from_application(app: &Application, www_root: &Path) -> Self {
        Self {
            name: app.name.clone(),
            identity_user: app.identity_user.clone(),
            identity_password: app.identity_password.clone(),
            home_dir: www_root.join(&app.identity_user),
            db_type: app.db_type,
            db_name: app.db_name.clone(),
            db_user: app.db_user.clone(),
            db_password: app.db_password.clone(),
            domains: app.domains(),
            port: app.port,
            tls: app.progress.tls,
        }
    }

    #[must_use]
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Static file root served by the reverse proxy.
    #[must_use]
    pub fn web_root(&self) -> PathBuf {
        self.home_dir.join("htdocs")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join("logs")
    }

    #[must_use]
    pub fn api_dir(&self) -> PathBuf {
        self.home_dir.join("api")
    }

    /// Directory served for ACME HTTP-01 challenges.
    #[must_use]
    pub fn acme_challenge_dir(&self) -> PathBuf {
        self.web_root().join(".well-known").join("acme-challenge")
    }
}
