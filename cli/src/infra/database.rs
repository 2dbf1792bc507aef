//! Database provisioner and login probe for MariaDB and PostgreSQL.
//!
//! Administrative DDL runs through the local client with superuser rights
//! over the unix socket (`mysql -u root`, `sudo -u postgres psql`) and is fed
//! on stdin so passwords never appear in the process table.

use anyhow::{Result, bail};
use turboship_common::{DbType, Subsystem};

use crate::application::ports::{CommandRunner, DatabaseProbe, ResourceProvisioner};
use crate::domain::application::AppSpec;
use crate::domain::error::ProvisionError;
use crate::domain::sql::{provision_script, teardown_script};
use crate::infra::command_runner::{checked, complaint};

const SUB: Subsystem = Subsystem::Database;

/// Runs DDL through the native database clients.
pub struct SqlDatabase<R: CommandRunner> {
    runner: R,
    mariadb_client: String,
    postgres_superuser: String,
}

impl<R: CommandRunner> SqlDatabase<R> {
    pub fn new(
        runner: R,
        mariadb_client: impl Into<String>,
        postgres_superuser: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            mariadb_client: mariadb_client.into(),
            postgres_superuser: postgres_superuser.into(),
        }
    }

    async fn run_admin(&self, db_type: DbType, script: &str) -> Result<(), ProvisionError> {
        let result = match db_type {
            DbType::Mariadb => {
                self.runner
                    .run_with_stdin(&self.mariadb_client, &["-u", "root"], script.as_bytes())
                    .await
            }
            DbType::Postgres => {
                self.runner
                    .run_with_stdin(
                        "sudo",
                        &[
                            "-u",
                            &self.postgres_superuser,
                            "psql",
                            "-v",
                            "ON_ERROR_STOP=1",
                            "-q",
                        ],
                        script.as_bytes(),
                    )
                    .await
            }
        };
        let what = match db_type {
            DbType::Mariadb => self.mariadb_client.as_str(),
            DbType::Postgres => "psql",
        };
        checked(SUB, what, result).map(drop)
    }
}

impl<R: CommandRunner> ResourceProvisioner for SqlDatabase<R> {
    async fn ensure(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let script = provision_script(spec.db_type, &spec.db_name, &spec.db_user, &spec.db_password);
        self.run_admin(spec.db_type, &script).await?;
        tracing::info!(db = %spec.db_name, user = %spec.db_user, kind = %spec.db_type, "database ready");
        Ok(())
    }

    async fn release(&self, spec: &AppSpec) -> Result<(), ProvisionError> {
        let script = teardown_script(spec.db_type, &spec.db_name, &spec.db_user);
        self.run_admin(spec.db_type, &script).await?;
        tracing::info!(db = %spec.db_name, "database dropped");
        Ok(())
    }
}

impl<R: CommandRunner> DatabaseProbe for SqlDatabase<R> {
    async fn check_login(&self, spec: &AppSpec) -> Result<()> {
        let output = match spec.db_type {
            DbType::Mariadb => {
                self.runner
                    .run_with_env(
                        &self.mariadb_client,
                        &[
                            "-h",
                            "127.0.0.1",
                            "-u",
                            &spec.db_user,
                            "-D",
                            &spec.db_name,
                            "-e",
                            "SELECT 1;",
                        ],
                        &[("MYSQL_PWD", spec.db_password.as_str())],
                    )
                    .await?
            }
            DbType::Postgres => {
                self.runner
                    .run_with_env(
                        "psql",
                        &[
                            "-h",
                            "127.0.0.1",
                            "-U",
                            &spec.db_user,
                            "-d",
                            &spec.db_name,
                            "-w",
                            "-c",
                            "SELECT 1;",
                        ],
                        &[("PGPASSWORD", spec.db_password.as_str())],
                    )
                    .await?
            }
        };
        if !output.status.success() {
            bail!("{}", complaint(&output));
        }
        Ok(())
    }
}
