//! Route provisioner backed by nginx.
//!
//! One site file per application in `sites-available`, linked from
//! `sites-enabled`. A candidate is validated with `nginx -t` before the
//! reload; if validation fails the previous file (or its absence) is restored
//! so the running configuration never changes.

use std::path::{Path, PathBuf};

use turboship_common::Subsystem;

use crate::application::ports::{CommandRunner, LocalFs, ResourceProvisioner};
use crate::domain::application::AppSpec;
use crate::domain::error::ProvisionError;
use crate::domain::route::render_site;
use crate::infra::command_runner::{checked, complaint};

const SUB: Subsystem = Subsystem::Route;

fn fs_err(e: &anyhow::Error) -> ProvisionError {
    ProvisionError::failed(SUB, format!("{e:#}"))
}

pub struct NginxRoute<R: CommandRunner, F: LocalFs> {
    runner: R,
    fs: F,
    sites_available: PathBuf,
    sites_enabled: PathBuf,
    live_dir: PathBuf,
}

impl<R: CommandRunner, F: LocalFs> NginxRoute<R, F> {
    pub fn new(
        runner: R,
        fs: F,
        sites_available: PathBuf,
        sites_enabled: PathBuf,
        live_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            fs,
            sites_available,
            sites_enabled,
            live_dir,
        }
    }

    /// Site file for `app` in `sites-available`.
    #[must_use]
    pub fn site_path(&self, app: &str) -> PathBuf {
        self.sites_available.join(site_file_name(app))
    }

    /// Link for `app` in `sites-enabled`.
    #[must_use]
    pub fn link_path(&self, app: &str) -> PathBuf {
        self.sites_enabled.join(site_file_name(app))
    }

    async fn validate(&self) -> Result<(), ProvisionError> {
        let output = self
            .runner
            .run("nginx", &["-t"])
            .await
            .map_err(|e| ProvisionError::failed(SUB, format!("nginx -t: {e:#}")))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ProvisionError::ConfigInvalid {
                subsystem: SUB,
                detail: complaint(&output),
            })
        }
    }

    async fn reload(&self) -> Result<(), ProvisionError> {
        checked(
            SUB,
            "systemctl reload nginx",
            self.runner.run("systemctl", &["reload", "nginx"]).await,
        )
        .map(drop)
    }

    /// Put back whatever was there before a rejected candidate.
    fn restore(&self, site: &Path, link: &Path, previous: Option<&str>, linked_now: bool) {
        let result = match previous {
            Some(text) => self.fs.write(site, text),
            None => self.fs.remove_file(site),
        };
        if let Err(e) = result {
            tracing::warn!(site = %site.display(), error = %e, "could not restore site file");
        }
        if linked_now && let Err(e) = self.fs.remove_file(link) {
            tracing::warn!(link = %link.display(), error = %e, "could not remove site link");
        }
    }
}

fn site_file_name(app: &str) -> String {
    format!("turboship-{app}.conf")
}

impl<R: CommandRunner, F: LocalFs> ResourceProvisioner for NginxRoute<R, F> {
    async fn ensure(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let site = self.site_path(&spec.name);
        let link = self.link_path(&spec.name);
        let rendered = render_site(spec, &self.live_dir);

        let previous = if self.fs.exists(&site) {
            Some(self.fs.read_to_string(&site).map_err(|e| fs_err(&e))?)
        } else {
            None
        };
        let linked = self.fs.exists(&link);
        if linked && previous.as_deref() == Some(rendered.as_str()) {
            tracing::debug!(app = %spec.name, "site unchanged");
            return Ok(());
        }

        self.fs.create_dir_all(&self.sites_available).map_err(|e| fs_err(&e))?;
        self.fs.create_dir_all(&self.sites_enabled).map_err(|e| fs_err(&e))?;
        self.fs.write(&site, &rendered).map_err(|e| fs_err(&e))?;
        if !linked && let Err(e) = self.fs.symlink(&site, &link) {
            self.restore(&site, &link, previous.as_deref(), false);
            return Err(fs_err(&e));
        }

        if let Err(e) = self.validate().await {
            tracing::warn!(app = %spec.name, error = %e, "nginx rejected site, restoring previous");
            self.restore(&site, &link, previous.as_deref(), !linked);
            return Err(e);
        }
        self.reload().await?;
        tracing::info!(app = %spec.name, domains = %spec.domains.join(" "), tls = spec.tls, "site applied");
        Ok(())
    }

    async fn release(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let mut removed = false;
        for path in [self.link_path(&spec.name), self.site_path(&spec.name)] {
            if self.fs.exists(&path) {
                self.fs.remove_file(&path).map_err(|e| fs_err(&e))?;
                removed = true;
            }
        }
        if removed {
            self.reload().await?;
            tracing::info!(app = %spec.name, "site removed");
        }
        Ok(())
    }
}
