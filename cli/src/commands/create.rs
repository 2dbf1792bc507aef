//! `turboship create <name> --db <type> [--domain <host>]`: provision an
//! application, or resume one a previous run left unfinished.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use turboship_common::DbType;

use crate::app::AppContext;
use crate::application::services::lifecycle::CreateRequest;
use crate::domain::application::validate_app_name;

/// Arguments for the create command.
#[derive(Args)]
pub struct CreateArgs {
    /// Application name (letters, digits, '-' and '_'; prompted when omitted)
    pub name: Option<String>,

    /// Database engine (prompted when omitted)
    #[arg(long, value_enum)]
    pub db: Option<DbType>,

    /// Custom domain served alongside the temporary sslip.io hostname
    #[arg(long)]
    pub domain: Option<String>,
}

/// Run `turboship create`.
///
/// # Errors
///
/// Returns an error if validation fails, the registry or lock is unavailable,
/// or a mandatory provisioning step fails.
pub async fn run(app: &AppContext, args: CreateArgs) -> Result<ExitCode> {
    let name = match args.name {
        Some(name) => name,
        None => app.prompt_text("Application name", "<name>")?,
    };
    // Fail before asking anything else.
    validate_app_name(&name)?;
    let db_type = match args.db {
        Some(db) => db,
        None => app.prompt_db_type()?,
    };

    let request = CreateRequest {
        name: &name,
        db_type,
        real_domain: args.domain.as_deref(),
    };
    let reporter = app.reporter();
    let outcome = app
        .lifecycle()
        .create(&request, &app.ip_resolver, &reporter)
        .await?;
    drop(reporter);

    app.renderer().created(&outcome)?;
    Ok(ExitCode::SUCCESS)
}
