//! Identity provisioner: the restricted OS account an application's owner
//! uses for file transfer, plus its home directory layout.
//!
//! Layout under `<www_root>/<identity_user>/`:
//! `htdocs/` (static root, with `.well-known/acme-challenge/`), `logs/`, and
//! `api/`. Everything is owned by the account with the web server's group and
//! set-gid so uploads stay readable by the web server.

use turboship_common::Subsystem;

use crate::application::ports::{CommandRunner, ResourceProvisioner};
use crate::domain::application::AppSpec;
use crate::domain::error::ProvisionError;
use crate::infra::command_runner::checked;

const SUB: Subsystem = Subsystem::Identity;

/// `userdel` exit code when the account is gone but its home or mail spool
/// could not be removed.
const USERDEL_PARTIAL: i32 = 12;

/// Account management through `useradd`/`chpasswd`/`userdel`.
pub struct SystemIdentity<R: CommandRunner> {
    runner: R,
    shell: String,
    web_group: String,
}

impl<R: CommandRunner> SystemIdentity<R> {
    pub fn new(runner: R, shell: impl Into<String>, web_group: impl Into<String>) -> Self {
        Self {
            runner,
            shell: shell.into(),
            web_group: web_group.into(),
        }
    }

    async fn account_exists(&self, user: &str) -> Result<bool, ProvisionError> {
        let output = self
            .runner
            .run("id", &["-u", user])
            .await
            .map_err(|e| ProvisionError::failed(SUB, format!("id: {e:#}")))?;
        Ok(output.status.success())
    }

    async fn install_dir(&self, spec: &AppSpec, dir: &str, mode: &str) -> Result<(), ProvisionError> {
        checked(
            SUB,
            "install -d",
            self.runner
                .run(
                    "install",
                    &[
                        "-d",
                        "-o",
                        &spec.identity_user,
                        "-g",
                        &self.web_group,
                        "-m",
                        mode,
                        dir,
                    ],
                )
                .await,
        )
        .map(drop)
    }
}

impl<R: CommandRunner> ResourceProvisioner for SystemIdentity<R> {
    async fn ensure(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let user = spec.identity_user.as_str();
        let home = spec.home_dir.display().to_string();

        if self.account_exists(user).await? {
            tracing::debug!(%user, "account already present");
        } else {
            checked(
                SUB,
                "useradd",
                self.runner
                    .run(
                        "useradd",
                        &["-m", "-d", &home, "-s", &self.shell, "-G", &self.web_group, user],
                    )
                    .await,
            )?;
            tracing::info!(%user, %home, "account created");
        }

        // Re-applied every run so repair heals drift.
        checked(
            SUB,
            "usermod",
            self.runner
                .run("usermod", &["-aG", &self.web_group, user])
                .await,
        )?;
        let line = format!("{user}:{}", spec.identity_password);
        checked(
            SUB,
            "chpasswd",
            self.runner
                .run_with_stdin("chpasswd", &[], line.as_bytes())
                .await,
        )?;

        self.install_dir(spec, &home, "2750").await?;
        for dir in [spec.web_root(), spec.logs_dir(), spec.api_dir(), spec.acme_challenge_dir()] {
            self.install_dir(spec, &dir.display().to_string(), "2775")
                .await?;
        }
        Ok(())
    }

    async fn release(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let user = spec.identity_user.as_str();
        if self.account_exists(user).await? {
            let result = self.runner.run("userdel", &["-r", user]).await;
            match result {
                Ok(out) if out.status.code() == Some(USERDEL_PARTIAL) => {
                    tracing::debug!(%user, "userdel left files behind");
                }
                other => {
                    checked(SUB, "userdel", other)?;
                }
            }
            tracing::info!(%user, "account removed");
        }

        let home = spec.home_dir.display().to_string();
        checked(
            SUB,
            "rm",
            self.runner
                .run("rm", &["-rf", "--one-file-system", "--", &home])
                .await,
        )
        .map(drop)
    }
}
