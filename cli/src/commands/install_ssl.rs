//! `turboship install-ssl <name>`: issue or renew the certificate and
//! switch the site to HTTPS.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::AppArg;

/// Run `turboship install-ssl`.
///
/// # Errors
///
/// Returns an error if the application does not exist or issuance fails.
pub async fn run(app: &AppContext, args: &AppArg) -> Result<ExitCode> {
    let reporter = app.reporter();
    let secured = app.lifecycle().install_ssl(&args.name, &reporter).await?;
    drop(reporter);
    app.renderer().secured(&secured)?;
    Ok(ExitCode::SUCCESS)
}
