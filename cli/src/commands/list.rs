//! `turboship list`: every application, sorted by name.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;

/// Run `turboship list`.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let apps = app.lifecycle().list().await?;
    app.renderer().list(&apps)?;
    Ok(ExitCode::SUCCESS)
}
