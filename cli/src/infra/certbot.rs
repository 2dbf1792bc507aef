//! Certificate provisioner backed by certbot's webroot authenticator.
//!
//! The route already serves `/.well-known/acme-challenge/` from the static
//! root, so issuance never touches the nginx configuration. One lineage per
//! application, named after it, covers every bound hostname.

use std::time::Duration;

use turboship_common::Subsystem;

use crate::application::ports::{CommandRunner, ResourceProvisioner};
use crate::domain::application::AppSpec;
use crate::domain::error::ProvisionError;
use crate::infra::command_runner::{checked, complaint};

const SUB: Subsystem = Subsystem::Certificate;

/// Pause between issuance attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

pub struct CertbotCertificate<R: CommandRunner> {
    runner: R,
    email: Option<String>,
    retries: u32,
    staging: bool,
    retry_delay: Duration,
}

impl<R: CommandRunner> CertbotCertificate<R> {
    pub fn new(runner: R, email: Option<String>, retries: u32, staging: bool) -> Self {
        Self {
            runner,
            email,
            retries,
            staging,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn email_for(&self, spec: &AppSpec) -> String {
        self.email.clone().unwrap_or_else(|| {
            let host = spec.domains.first().map_or("localhost", String::as_str);
            format!("admin@{host}")
        })
    }

    /// `certbot certonly` arguments for `spec`.
    #[must_use]
    pub fn issue_args(&self, spec: &AppSpec) -> Vec<String> {
        let mut args: Vec<String> = [
            "certonly",
            "--webroot",
            "-w",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        args.push(spec.web_root().display().to_string());
        args.extend(
            [
                "--cert-name",
                spec.name.as_str(),
                "--non-interactive",
                "--agree-tos",
                "--expand",
                "--keep-until-expiring",
                "-m",
            ]
            .iter()
            .map(ToString::to_string),
        );
        args.push(self.email_for(spec));
        if self.staging {
            args.push("--staging".to_string());
        }
        for domain in &spec.domains {
            args.push("-d".to_string());
            args.push(domain.clone());
        }
        args
    }
}

impl<R: CommandRunner> ResourceProvisioner for CertbotCertificate<R> {
    async fn ensure(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        if spec.domains.is_empty() {
            return Err(ProvisionError::failed(SUB, "no hostnames to certify"));
        }
        let owned = self.issue_args(spec);
        let args: Vec<&str> = owned.iter().map(String::as_str).collect();

        let attempts = self.retries.saturating_add(1);
        let mut last = None;
        for attempt in 1..=attempts {
            match checked(SUB, "certbot", self.runner.run("certbot", &args).await) {
                Ok(_) => {
                    tracing::info!(app = %spec.name, attempt, "certificate issued");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(app = %spec.name, attempt, attempts, error = %e, "certbot failed");
                    last = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(last.unwrap_or_else(|| ProvisionError::failed(SUB, "certbot was not run")))
    }

    async fn release(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let output = self
            .runner
            .run(
                "certbot",
                &["delete", "--cert-name", &spec.name, "--non-interactive"],
            )
            .await
            .map_err(|e| ProvisionError::failed(SUB, format!("certbot delete: {e:#}")))?;
        if output.status.success() {
            tracing::info!(app = %spec.name, "certificate deleted");
            return Ok(());
        }
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if text.contains("No certificate found") {
            tracing::debug!(app = %spec.name, "no certificate to delete");
            return Ok(());
        }
        Err(ProvisionError::failed(
            SUB,
            format!("certbot delete: {}", complaint(&output)),
        ))
    }
}
