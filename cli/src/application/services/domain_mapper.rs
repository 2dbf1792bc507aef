//! Application service: attach a custom domain to an existing application.
//!
//! The registry is updated only after the reverse proxy accepted the new site,
//! so a rejected configuration leaves both the route and the row as they were.

use anyhow::Result;
use turboship_common::Application;

use crate::application::ports::{
    AllocationLock, ProgressReporter, RegistryStore, ResourceProvisioner,
};
use crate::application::services::lifecycle::{CertificateStatus, Lifecycle, require_route};
use crate::domain::application::{AppSpec, normalize_domain, validate_app_name};
use crate::domain::error::LifecycleError;
use turboship_common::Subsystem;

/// Outcome of [`Lifecycle::map_domain`].
#[derive(Debug, Clone)]
pub struct MapDomainOutcome {
    pub app: Application,
    pub certificate: CertificateStatus,
}

impl<S, L, I, D, R, C> Lifecycle<'_, S, L, I, D, R, C>
where
    S: RegistryStore,
    L: AllocationLock,
    I: ResourceProvisioner,
    D: ResourceProvisioner,
    R: ResourceProvisioner,
    C: ResourceProvisioner,
{
    /// Route `domain` alongside the temp domain, then try to certify both.
    ///
    /// Replaces any previously mapped domain.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed name or hostname, `NotFound`,
    /// `DuplicateKey` when another application already serves `domain`, or
    /// `Provision` when the route is rejected. Certificate failures are
    /// reported in the outcome instead.
    pub async fn map_domain(
        &self,
        name: &str,
        domain: &str,
        reporter: &impl ProgressReporter,
    ) -> Result<MapDomainOutcome> {
        validate_app_name(name)?;
        let domain = normalize_domain(domain)?;
        if domain.ends_with(".sslip.io") {
            return Err(LifecycleError::Validation(format!(
                "'{domain}' is a temporary sslip.io hostname; map a domain you control"
            ))
            .into());
        }

        let _guard = self.lock.acquire().await?;

        let mut app = self.store.get(name).await?;
        require_route(&app)?;
        self.check_hostnames(name, std::slice::from_ref(&domain), false)
            .await?;

        let mut target = app.clone();
        target.real_domain = Some(domain.clone());
        let spec = AppSpec::from_application(&target, &self.settings.www_root);

        reporter.step(&format!("routing {} to '{name}'", spec.domains.join(", ")));
        if let Err(source) = self
            .bounded(Subsystem::Route, self.provisioners.route.ensure(&spec))
            .await
        {
            tracing::error!(app = %name, %domain, error = %source, "route rejected");
            return Err(LifecycleError::Provision {
                app: app.name,
                subsystem: Subsystem::Route,
                furthest: app.progress.state,
                source,
            }
            .into());
        }
        reporter.success(&format!("{domain} routed"));

        self.store.update_domain(name, Some(&domain)).await?;
        app.real_domain = Some(domain);
        tracing::info!(app = %name, domain = ?app.real_domain, "domain mapped");

        let certificate = self.secure(&mut app, reporter).await?;
        Ok(MapDomainOutcome { app, certificate })
    }
}
