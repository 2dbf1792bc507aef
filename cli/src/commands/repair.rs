//! `turboship repair <name>`: re-run every provisioning step.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::AppArg;

/// Run `turboship repair`.
///
/// # Errors
///
/// Returns an error if the application does not exist or a mandatory step
/// fails.
pub async fn run(app: &AppContext, args: &AppArg) -> Result<ExitCode> {
    let reporter = app.reporter();
    let outcome = app.lifecycle().repair(&args.name, &reporter).await?;
    drop(reporter);
    app.renderer().created(&outcome)?;
    Ok(ExitCode::SUCCESS)
}
