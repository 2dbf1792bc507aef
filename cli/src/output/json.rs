//! JSON output helpers.
//!
//! Every `--json` code path writes exactly one pretty-printed document to
//! stdout. Failures use the error object from [`format_error`].

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use turboship_common::Application;

use crate::application::services::domain_mapper::MapDomainOutcome;
use crate::application::services::lifecycle::{CertificateStatus, CreateOutcome, DeleteReport};
use crate::domain::config::TurboshipConfig;
use crate::domain::health::HealthReport;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice: `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// `{"issued": bool, "error": string?}`
#[must_use]
pub fn certificate_value(status: &CertificateStatus) -> Value {
    match status {
        CertificateStatus::Issued => json!({ "issued": true }),
        CertificateStatus::Failed(e) => json!({ "issued": false, "error": e.to_string() }),
    }
}

fn emit(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

fn app_value(app: &Application) -> Result<Value> {
    serde_json::to_value(app).context("JSON serialization failed")
}

/// Machine-readable renderer selected by `--json`.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_created(&self, outcome: &CreateOutcome) -> Result<()> {
        emit(&json!({
            "app": app_value(&outcome.app)?,
            "resumed": outcome.resumed,
            "certificate": certificate_value(&outcome.certificate),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deleted(&self, report: &DeleteReport) -> Result<()> {
        let remnants: Vec<Value> = report
            .remnants
            .iter()
            .map(|e| json!({ "subsystem": e.subsystem().as_str(), "message": e.to_string() }))
            .collect();
        emit(&json!({
            "deleted": report.app.name,
            "remnants": remnants,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_list(&self, apps: &[Application]) -> Result<()> {
        emit(&serde_json::to_value(apps).context("JSON serialization failed")?)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_info(&self, app: &Application) -> Result<()> {
        emit(&app_value(app)?)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_health(&self, report: &HealthReport) -> Result<()> {
        let mut value = serde_json::to_value(report).context("JSON serialization failed")?;
        if let Value::Object(map) = &mut value {
            map.insert("ok".to_string(), Value::Bool(report.all_ok()));
        }
        emit(&value)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_domain_mapped(&self, outcome: &MapDomainOutcome) -> Result<()> {
        emit(&json!({
            "app": app_value(&outcome.app)?,
            "certificate": certificate_value(&outcome.certificate),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_secured(&self, app: &Application) -> Result<()> {
        emit(&json!({
            "app": app_value(app)?,
            "certificate": certificate_value(&CertificateStatus::Issued),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &TurboshipConfig, path: &Path) -> Result<()> {
        emit(&json!({
            "path": path.display().to_string(),
            "config": serde_json::to_value(config).context("JSON serialization failed")?,
        }))
    }
}
