//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
use turboship_common::Application;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::domain_mapper::MapDomainOutcome;
use crate::application::services::lifecycle::{CreateOutcome, DeleteReport};
use crate::domain::config::TurboshipConfig;
use crate::domain::error::{ConfigError, LifecycleError};
use crate::domain::health::HealthReport;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<16}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renders command results in the mode selected on the command line.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn created(&self, outcome: &CreateOutcome) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_created(outcome);
                Ok(())
            }
            Self::Json(r) => r.render_created(outcome),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn deleted(&self, report: &DeleteReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_deleted(report);
                Ok(())
            }
            Self::Json(r) => r.render_deleted(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn list(&self, apps: &[Application]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_list(apps);
                Ok(())
            }
            Self::Json(r) => r.render_list(apps),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn info(&self, app: &Application) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_info(app);
                Ok(())
            }
            Self::Json(r) => r.render_info(app),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn health(&self, report: &HealthReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_health(report);
                Ok(())
            }
            Self::Json(r) => r.render_health(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn domain_mapped(&self, outcome: &MapDomainOutcome) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_domain_mapped(outcome);
                Ok(())
            }
            Self::Json(r) => r.render_domain_mapped(outcome),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn secured(&self, app: &Application) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_secured(app);
                Ok(())
            }
            Self::Json(r) => r.render_secured(app),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON or YAML serialization fails.
    pub fn config(&self, config: &TurboshipConfig, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => r.render_config(config, path),
            Self::Json(r) => r.render_config(config, path),
        }
    }
}

/// Stable code for the `--json` error object.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<LifecycleError>() {
        e.code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "config_error"
    } else {
        "error"
    }
}

/// Message shown for a failed command. Lifecycle errors already embed their
/// cause; anything else gets its context chain.
#[must_use]
pub fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<LifecycleError>() {
        Some(e) => e.to_string(),
        None => format!("{err:#}"),
    }
}
