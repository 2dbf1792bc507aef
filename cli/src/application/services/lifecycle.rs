//! Application service: the lifecycle orchestrator.
//!
//! Drives the four provisioners in a fixed order, records progress in the
//! registry after every step, and serializes every mutating operation behind
//! the allocation lock. Imports only from `crate::domain`,
//! `crate::application::ports` and the shared record schema.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use turboship_common::{
    Application, DbType, Progress, ProvisionState, StepFailure, Subsystem, naming,
};

use crate::application::ports::{
    AllocationLock, ProgressReporter, Provisioners, PublicIpResolver, RegistryStore,
    ResourceProvisioner,
};
use crate::application::services::port_allocator;
use crate::domain::allocation::PortRange;
use crate::domain::application::{AppSpec, normalize_domain, validate_app_name};
use crate::domain::config::TurboshipConfig;
use crate::domain::credentials::random_secret;
use crate::domain::error::{LifecycleError, ProvisionError};

/// Host settings the orchestrator needs, lifted out of [`TurboshipConfig`].
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub www_root: PathBuf,
    pub port_range: PortRange,
    pub secret_length: usize,
    /// Upper bound on a single `ensure`/`release` call.
    pub adapter_timeout: Duration,
}

impl LifecycleSettings {
    #[must_use]
    pub fn from_config(config: &TurboshipConfig) -> Self {
        Self {
            www_root: config.www_root.clone(),
            port_range: config.port_range(),
            secret_length: config.secret_length,
            adapter_timeout: config.adapter_timeout(),
        }
    }
}

/// Input to [`Lifecycle::create`].
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    pub name: &'a str,
    pub db_type: DbType,
    pub real_domain: Option<&'a str>,
}

/// Result of the certificate step, which never fails a create, repair or
/// domain mapping on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateStatus {
    Issued,
    Failed(ProvisionError),
}

impl CertificateStatus {
    #[must_use]
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued)
    }
}

/// Outcome of `create` and `repair`.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub app: Application,
    /// `true` when an existing partial row was continued.
    pub resumed: bool,
    pub certificate: CertificateStatus,
}

/// Outcome of `delete`. The row is gone even when `remnants` is non-empty.
#[derive(Debug, Clone)]
pub struct DeleteReport {
    pub app: Application,
    /// Release failures; each names a resource that may need manual cleanup.
    pub remnants: Vec<ProvisionError>,
}

/// Lifecycle orchestrator over injected ports.
pub struct Lifecycle<'a, S, L, I, D, R, C> {
    pub(crate) store: &'a S,
    pub(crate) lock: &'a L,
    pub(crate) provisioners: &'a Provisioners<I, D, R, C>,
    pub(crate) settings: &'a LifecycleSettings,
}

impl<'a, S, L, I, D, R, C> Lifecycle<'a, S, L, I, D, R, C>
where
    S: RegistryStore,
    L: AllocationLock,
    I: ResourceProvisioner,
    D: ResourceProvisioner,
    R: ResourceProvisioner,
    C: ResourceProvisioner,
{
    pub fn new(
        store: &'a S,
        lock: &'a L,
        provisioners: &'a Provisioners<I, D, R, C>,
        settings: &'a LifecycleSettings,
    ) -> Self {
        Self {
            store,
            lock,
            provisioners,
            settings,
        }
    }

    /// Provision a new application, or continue one a previous run left
    /// partially provisioned.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Validation` before any side effect for bad
    /// input, `AlreadyExists` for a fully provisioned name,
    /// `TeardownPending` for a half-deleted one, `DuplicateKey` when another
    /// application already answers to one of the hostnames,
    /// `AllocationExhausted` when no port is free, and `Provision` when a hard
    /// step fails.
    pub async fn create(
        &self,
        request: &CreateRequest<'_>,
        resolver: &impl PublicIpResolver,
        reporter: &impl ProgressReporter,
    ) -> Result<CreateOutcome> {
        validate_app_name(request.name)?;
        let real_domain = request.real_domain.map(normalize_domain).transpose()?;

        let _guard = self.lock.acquire().await?;

        let (app, resumed) = match self.store.find(request.name).await? {
            Some(existing) => {
                check_resumable(&existing, request.db_type)?;
                if let Some(domain) = &real_domain {
                    self.check_hostnames(&existing.name, std::slice::from_ref(domain), false)
                        .await?;
                }
                reporter.step(&format!(
                    "resuming '{}' from state {}",
                    existing.name, existing.progress.state
                ));
                tracing::info!(app = %existing.name, state = %existing.progress.state, "resuming");
                (existing, true)
            }
            None => (
                self.claim(request, real_domain.as_deref(), resolver, reporter)
                    .await?,
                false,
            ),
        };

        let target = real_domain.or_else(|| app.real_domain.clone());
        let (app, certificate) = self.provision(app, target, false, reporter).await?;
        Ok(CreateOutcome {
            app,
            resumed,
            certificate,
        })
    }

    /// Re-run every `ensure` for an existing application.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `TeardownPending`, or `Provision` on a hard failure.
    pub async fn repair(&self, name: &str, reporter: &impl ProgressReporter) -> Result<CreateOutcome> {
        validate_app_name(name)?;
        let _guard = self.lock.acquire().await?;

        let app = self.store.get(name).await?;
        if app.progress.state == ProvisionState::TearingDown {
            return Err(LifecycleError::TeardownPending(app.name).into());
        }
        let target = app.real_domain.clone();
        let (app, certificate) = self.provision(app, target, true, reporter).await?;
        Ok(CreateOutcome {
            app,
            resumed: true,
            certificate,
        })
    }

    /// Release every resource of an application and remove its row.
    ///
    /// Release failures are collected, not fatal. The row is marked
    /// `TearingDown` before the first release so an interrupted delete is
    /// visible to later runs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name, or a registry error.
    pub async fn delete(&self, name: &str, reporter: &impl ProgressReporter) -> Result<DeleteReport> {
        validate_app_name(name)?;
        let _guard = self.lock.acquire().await?;

        let mut app = self.store.get(name).await?;
        if app.progress.state != ProvisionState::TearingDown {
            app.progress.state = ProvisionState::TearingDown;
            self.store.update_progress(name, &app.progress).await?;
        }

        let spec = AppSpec::from_application(&app, &self.settings.www_root);
        let p = self.provisioners;
        let mut remnants = Vec::new();
        self.release_step(Subsystem::Route, p.route.release(&spec), &mut remnants, reporter)
            .await;
        self.release_step(
            Subsystem::Certificate,
            p.certificate.release(&spec),
            &mut remnants,
            reporter,
        )
        .await;
        self.release_step(Subsystem::Database, p.database.release(&spec), &mut remnants, reporter)
            .await;
        self.release_step(Subsystem::Identity, p.identity.release(&spec), &mut remnants, reporter)
            .await;

        self.store.delete(name).await?;
        tracing::info!(app = %name, remnants = remnants.len(), "application deleted");
        Ok(DeleteReport { app, remnants })
    }

    /// Issue or renew the certificate and switch the route to TLS.
    ///
    /// Unlike `create`, a certificate failure here is returned.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Validation` when the route is not in place yet, or
    /// `LifecycleError::Certificate`.
    pub async fn install_ssl(&self, name: &str, reporter: &impl ProgressReporter) -> Result<Application> {
        validate_app_name(name)?;
        let _guard = self.lock.acquire().await?;

        let mut app = self.store.get(name).await?;
        require_route(&app)?;
        match self.secure(&mut app, reporter).await? {
            CertificateStatus::Issued => Ok(app),
            CertificateStatus::Failed(source) => Err(LifecycleError::Certificate {
                app: app.name,
                source,
            }
            .into()),
        }
    }

    /// Read one row.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed name or `NotFound`.
    pub async fn info(&self, name: &str) -> Result<Application> {
        validate_app_name(name)?;
        self.store.get(name).await
    }

    /// Every row, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns the registry's read error.
    pub async fn list(&self) -> Result<Vec<Application>> {
        let mut apps = self.store.list_all().await?;
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    // ── Steps ────────────────────────────────────────────────────────────────

    /// Fail with `DuplicateKey` when a row other than `name` already answers
    /// to one of `hostnames`. With `same_label`, a row whose name maps to the
    /// same DNS label also clashes, whatever address its temp domain carries.
    pub(crate) async fn check_hostnames(
        &self,
        name: &str,
        hostnames: &[String],
        same_label: bool,
    ) -> Result<()> {
        let label = naming::host_label(name);
        for other in self.store.list_all().await? {
            if other.name == name {
                continue;
            }
            let bound = other.domains();
            let clash = hostnames
                .iter()
                .find(|h| bound.contains(*h))
                .cloned()
                .or_else(|| {
                    (same_label && naming::host_label(&other.name) == label)
                        .then(|| other.temp_domain.clone())
                });
            if let Some(host) = clash {
                return Err(LifecycleError::DuplicateKey {
                    key: format!("hostname '{host}' (used by '{}')", other.name),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Generate credentials, allocate a port and insert the row.
    async fn claim(
        &self,
        request: &CreateRequest<'_>,
        real_domain: Option<&str>,
        resolver: &impl PublicIpResolver,
        reporter: &impl ProgressReporter,
    ) -> Result<Application> {
        let name = request.name;
        let ip = resolver
            .public_ip()
            .await
            .context("failed to determine the server's public IP address")?;
        let temp_domain = naming::temp_domain(name, ip);
        let hostnames: Vec<String> = std::iter::once(temp_domain.clone())
            .chain(real_domain.map(str::to_string))
            .collect();
        self.check_hostnames(name, &hostnames, true).await?;

        let port = port_allocator::allocate(self.store, self.settings.port_range).await?;
        let len = self.settings.secret_length;

        let app = Application {
            name: name.to_string(),
            identity_user: naming::identity_user(name),
            identity_password: random_secret(len),
            db_type: request.db_type,
            db_name: naming::db_name(name),
            db_user: naming::db_user(name),
            db_password: random_secret(len),
            temp_domain,
            real_domain: None,
            port,
            created_at: Utc::now(),
            progress: Progress {
                state: ProvisionState::PortAllocated,
                tls: false,
                failure: None,
            },
        };
        self.store.insert(&app).await?;
        tracing::info!(app = %name, port, "registry row inserted");
        reporter.success(&format!("reserved port {port} for '{name}'"));
        Ok(app)
    }

    /// Run identity, database and route, then the soft certificate step.
    /// With `force` every step runs, otherwise completed steps are skipped.
    async fn provision(
        &self,
        mut app: Application,
        real_domain: Option<String>,
        force: bool,
        reporter: &impl ProgressReporter,
    ) -> Result<(Application, CertificateStatus)> {
        let p = self.provisioners;
        let spec = AppSpec::from_application(&app, &self.settings.www_root);

        if force || app.progress.state < ProvisionState::IdentityReady {
            self.hard_step(&mut app, Subsystem::Identity, p.identity.ensure(&spec), reporter)
                .await?;
        }
        if force || app.progress.state < ProvisionState::DatabaseReady {
            self.hard_step(&mut app, Subsystem::Database, p.database.ensure(&spec), reporter)
                .await?;
        }

        let domain_changed = real_domain != app.real_domain;
        if force || domain_changed || app.progress.state < ProvisionState::RouteReady {
            let mut target = app.clone();
            target.real_domain.clone_from(&real_domain);
            let route_spec = spec.clone().with_domains(target.domains());
            self.hard_step(&mut app, Subsystem::Route, p.route.ensure(&route_spec), reporter)
                .await?;
            if domain_changed {
                self.store
                    .update_domain(&app.name, real_domain.as_deref())
                    .await?;
                app.real_domain = real_domain;
            }
        }

        let certificate = self.secure(&mut app, reporter).await?;
        app.progress.state = ProvisionState::Active;
        app.progress.failure = None;
        self.store.update_progress(&app.name, &app.progress).await?;
        tracing::info!(app = %app.name, tls = app.progress.tls, "application active");
        Ok((app, certificate))
    }

    /// Certificate step followed by the TLS route. Failures are reported, not
    /// returned; the route keeps its previous configuration.
    pub(crate) async fn secure(
        &self,
        app: &mut Application,
        reporter: &impl ProgressReporter,
    ) -> Result<CertificateStatus> {
        let p = self.provisioners;
        let spec = AppSpec::from_application(app, &self.settings.www_root);

        reporter.step(&format!("requesting certificate for {}", spec.domains.join(", ")));
        if let Err(e) = self
            .bounded(Subsystem::Certificate, p.certificate.ensure(&spec))
            .await
        {
            tracing::warn!(app = %app.name, error = %e, "certificate issuance failed");
            reporter.warn(&format!(
                "certificate not issued ({e}); retry with 'turboship install-ssl {}'",
                app.name
            ));
            return Ok(CertificateStatus::Failed(e));
        }

        let tls_spec = spec.with_tls(true);
        if let Err(e) = self.bounded(Subsystem::Route, p.route.ensure(&tls_spec)).await {
            tracing::warn!(app = %app.name, error = %e, "tls route rejected");
            reporter.warn(&format!("certificate issued but HTTPS route not applied: {e}"));
            return Ok(CertificateStatus::Failed(e));
        }

        app.progress.tls = true;
        if app.progress.state < ProvisionState::Secured {
            app.progress.state = ProvisionState::Secured;
        }
        self.store.update_progress(&app.name, &app.progress).await?;
        reporter.success(&format!("HTTPS enabled for '{}'", app.name));
        Ok(CertificateStatus::Issued)
    }

    /// Run one hard step. Success advances the state; failure is recorded in
    /// the row and returned as `LifecycleError::Provision`.
    async fn hard_step(
        &self,
        app: &mut Application,
        subsystem: Subsystem,
        step: impl Future<Output = Result<(), ProvisionError>>,
        reporter: &impl ProgressReporter,
    ) -> Result<()> {
        reporter.step(&format!("{} for '{}'", step_label(subsystem), app.name));
        match self.bounded(subsystem, step).await {
            Ok(()) => {
                let ready = subsystem.ready_state();
                if app.progress.state < ready {
                    app.progress.state = ready;
                }
                self.store.update_progress(&app.name, &app.progress).await?;
                tracing::debug!(app = %app.name, %subsystem, "step complete");
                reporter.success(&format!("{subsystem} ready"));
                Ok(())
            }
            Err(source) => {
                let before = state_before(subsystem);
                if app.progress.state > before {
                    app.progress.state = before;
                }
                app.progress.failure = Some(StepFailure {
                    subsystem,
                    message: source.to_string(),
                    at: Utc::now(),
                });
                if let Err(e) = self.store.update_progress(&app.name, &app.progress).await {
                    tracing::warn!(app = %app.name, error = %e, "could not record step failure");
                }
                tracing::error!(app = %app.name, %subsystem, error = %source, "step failed");
                Err(LifecycleError::Provision {
                    app: app.name.clone(),
                    subsystem,
                    furthest: app.progress.state,
                    source,
                }
                .into())
            }
        }
    }

    async fn release_step(
        &self,
        subsystem: Subsystem,
        step: impl Future<Output = Result<(), ProvisionError>>,
        remnants: &mut Vec<ProvisionError>,
        reporter: &impl ProgressReporter,
    ) {
        reporter.step(&format!("releasing {subsystem}"));
        match self.bounded(subsystem, step).await {
            Ok(()) => reporter.success(&format!("{subsystem} released")),
            Err(e) => {
                tracing::warn!(%subsystem, error = %e, "release failed");
                reporter.warn(&format!("{e} (may need manual cleanup)"));
                remnants.push(e);
            }
        }
    }

    /// Apply the per-adapter timeout.
    pub(crate) async fn bounded(
        &self,
        subsystem: Subsystem,
        step: impl Future<Output = Result<(), ProvisionError>>,
    ) -> Result<(), ProvisionError> {
        let limit = self.settings.adapter_timeout;
        tokio::time::timeout(limit, step)
            .await
            .unwrap_or(Err(ProvisionError::TimedOut {
                subsystem,
                secs: limit.as_secs(),
            }))
    }
}

/// Decide whether an existing row may be continued by `create`.
fn check_resumable(existing: &Application, db_type: DbType) -> Result<(), LifecycleError> {
    if existing.progress.state == ProvisionState::TearingDown {
        return Err(LifecycleError::TeardownPending(existing.name.clone()));
    }
    if existing.is_active() {
        return Err(LifecycleError::AlreadyExists(existing.name.clone()));
    }
    if existing.db_type != db_type {
        return Err(LifecycleError::Validation(format!(
            "'{}' was started with {}; resume it with --db {}",
            existing.name, existing.db_type, existing.db_type
        )));
    }
    Ok(())
}

/// Routes and certificates need the route step to have completed once.
pub(crate) fn require_route(app: &Application) -> Result<(), LifecycleError> {
    match app.progress.state {
        ProvisionState::TearingDown => Err(LifecycleError::TeardownPending(app.name.clone())),
        s if s < ProvisionState::RouteReady => Err(LifecycleError::Validation(format!(
            "'{}' has not finished provisioning (state: {s}); run 'turboship repair {}' first",
            app.name, app.name
        ))),
        _ => Ok(()),
    }
}

/// Furthest state that still holds after `subsystem` fails.
fn state_before(subsystem: Subsystem) -> ProvisionState {
    match subsystem {
        Subsystem::Identity => ProvisionState::PortAllocated,
        Subsystem::Database => ProvisionState::IdentityReady,
        Subsystem::Route => ProvisionState::DatabaseReady,
        Subsystem::Certificate => ProvisionState::RouteReady,
    }
}

fn step_label(subsystem: Subsystem) -> &'static str {
    match subsystem {
        Subsystem::Identity => "creating file-transfer account",
        Subsystem::Database => "creating database",
        Subsystem::Route => "writing reverse-proxy site",
        Subsystem::Certificate => "requesting certificate",
    }
}
