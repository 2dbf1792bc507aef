//! Human-readable terminal renderer.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;
use turboship_common::Application;

use crate::application::services::domain_mapper::MapDomainOutcome;
use crate::application::services::lifecycle::{CertificateStatus, CreateOutcome, DeleteReport};
use crate::domain::config::TurboshipConfig;
use crate::domain::health::{CheckResult, HealthReport};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_created(&self, outcome: &CreateOutcome) {
        let app = &outcome.app;
        println!();
        let verb = if outcome.resumed { "ready" } else { "created" };
        self.ctx.header(&format!("Application '{}' {verb}", app.name));
        println!();
        self.render_credentials(app);
        if let CertificateStatus::Failed(e) = &outcome.certificate {
            println!();
            self.ctx.warn(&format!("HTTPS is not active: {e}"));
            self.ctx
                .info(&format!("Retry: turboship install-ssl {}", app.name));
        }
    }

    pub fn render_deleted(&self, report: &DeleteReport) {
        if report.remnants.is_empty() {
            self.ctx
                .success(&format!("Application '{}' deleted", report.app.name));
            return;
        }
        self.ctx.warn(&format!(
            "Application '{}' removed from the registry; some resources need manual cleanup:",
            report.app.name
        ));
        for remnant in &report.remnants {
            println!("    {} {remnant}", "✗".style(self.ctx.styles.error));
        }
    }

    pub fn render_list(&self, apps: &[Application]) {
        if apps.is_empty() {
            if !self.ctx.quiet {
                println!("No applications. Create one: turboship create <name> --db mariadb");
            }
            return;
        }
        println!(
            "  {}",
            format!(
                "{:<20} {:<9} {:<6} {:<12} {:<4} {}",
                "NAME", "DB", "PORT", "STATE", "TLS", "DOMAINS"
            )
            .style(self.ctx.styles.bold)
        );
        for app in apps {
            println!("  {}", list_row(app));
        }
    }

    pub fn render_info(&self, app: &Application) {
        println!();
        self.ctx.header(&format!("Application '{}'", app.name));
        println!();
        self.render_credentials(app);
        self.ctx.kv("State:", &state_label(app));
        self.ctx.kv("TLS:", if app.progress.tls { "on" } else { "off" });
        if let Some(failure) = &app.progress.failure {
            self.ctx.kv(
                "Last failure:",
                &format!(
                    "{} at {}: {}",
                    failure.subsystem,
                    failure.at.format("%Y-%m-%d %H:%M:%S UTC"),
                    failure.message
                ),
            );
        }
    }

    pub fn render_health(&self, report: &HealthReport) {
        println!();
        self.ctx.header(&format!("Health of '{}'", report.app));
        println!();
        for check in report.checks() {
            self.print_check(check);
        }
        println!();
        if report.all_ok() {
            self.ctx.success("All checks passed");
        } else {
            self.ctx.warn(&format!(
                "{} check(s) failed",
                report.failures().len()
            ));
        }
    }

    pub fn render_domain_mapped(&self, outcome: &MapDomainOutcome) {
        let app = &outcome.app;
        let domain = app.real_domain.as_deref().unwrap_or_default();
        self.ctx
            .success(&format!("{domain} now routes to '{}'", app.name));
        match &outcome.certificate {
            CertificateStatus::Issued => self.ctx.info(&format!("https://{domain}")),
            CertificateStatus::Failed(e) => {
                self.ctx.warn(&format!("HTTPS is not active: {e}"));
                self.ctx.info(&format!(
                    "Point DNS for {domain} at this server, then run: turboship install-ssl {}",
                    app.name
                ));
            }
        }
    }

    pub fn render_secured(&self, app: &Application) {
        self.ctx
            .success(&format!("HTTPS active for {}", app.domains().join(", ")));
    }

    /// Render the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn render_config(&self, config: &TurboshipConfig, path: &Path) -> Result<()> {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        let yaml = serde_yaml::to_string(config).context("cannot serialize config")?;
        for line in yaml.lines() {
            println!("  {line}");
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        println!(
            "    {:<18} {}",
            "TURBOSHIP_CONFIG:",
            std::env::var("TURBOSHIP_CONFIG").unwrap_or_else(|_| "(not set)".to_string())
        );
        println!(
            "    {:<18} {}",
            "RUST_LOG:",
            std::env::var("RUST_LOG").unwrap_or_else(|_| "(not set)".to_string())
        );
        Ok(())
    }

    fn render_credentials(&self, app: &Application) {
        let secret = |s: &str| s.style(self.ctx.styles.secret).to_string();
        for domain in app.domains() {
            let scheme = if app.progress.tls { "https" } else { "http" };
            self.ctx.kv("URL:", &format!("{scheme}://{domain}"));
        }
        self.ctx.kv("Port:", &app.port.to_string());
        self.ctx.kv("SFTP user:", &app.identity_user);
        self.ctx.kv("SFTP password:", &secret(&app.identity_password));
        self.ctx.kv("Database:", &format!("{} ({})", app.db_name, app.db_type));
        self.ctx.kv("DB user:", &app.db_user);
        self.ctx.kv("DB password:", &secret(&app.db_password));
        self.ctx.kv(
            "Created:",
            &app.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
    }

    fn print_check(&self, check: &CheckResult) {
        if check.ok {
            println!("    {} {}", "✓".style(self.ctx.styles.success), check.name);
        } else {
            println!(
                "    {} {}: {}",
                "✗".style(self.ctx.styles.error),
                check.name,
                check.detail.as_deref().unwrap_or("failed")
            );
        }
    }
}

/// `state` plus a failure marker.
#[must_use]
pub fn state_label(app: &Application) -> String {
    match &app.progress.failure {
        Some(f) => format!("{} ({} failed)", app.progress.state, f.subsystem),
        None => app.progress.state.to_string(),
    }
}

/// One padded row of the `list` table.
#[must_use]
pub fn list_row(app: &Application) -> String {
    let state = if app.progress.failure.is_some() {
        format!("{}!", app.progress.state)
    } else {
        app.progress.state.to_string()
    };
    format!(
        "{:<20} {:<9} {:<6} {:<12} {:<4} {}",
        app.name,
        app.db_type.to_string(),
        app.port,
        state,
        if app.progress.tls { "yes" } else { "no" },
        app.domains().join(", ")
    )
}
