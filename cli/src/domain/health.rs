//! Health check domain types and pure diagnostic functions.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use serde::Serialize;

/// Outcome of a single check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckResult {
    /// Short label, e.g. `"dns acme.example.com"`.
    pub name: String,
    pub ok: bool,
    /// Human-readable detail (error text or observed value).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: None,
        }
    }

    #[must_use]
    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

/// All checks run by `turboship test <app>`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub app: String,
    pub dns: Vec<CheckResult>,
    pub backend: CheckResult,
    pub database: CheckResult,
}

impl HealthReport {
    /// Every check, in display order.
    pub fn checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.dns
            .iter()
            .chain(std::iter::once(&self.backend))
            .chain(std::iter::once(&self.database))
    }

    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.checks().all(|c| c.ok)
    }

    /// Names of failed checks.
    #[must_use]
    pub fn failures(&self) -> Vec<&str> {
        self.checks()
            .filter(|c| !c.ok)
            .map(|c| c.name.as_str())
            .collect()
    }
}
