//! `turboship info <name>`: one application with credentials and progress.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::AppArg;

/// Run `turboship info`.
///
/// # Errors
///
/// Returns an error if the application does not exist.
pub async fn run(app: &AppContext, args: &AppArg) -> Result<ExitCode> {
    let row = app.lifecycle().info(&args.name).await?;
    app.renderer().info(&row)?;
    Ok(ExitCode::SUCCESS)
}
