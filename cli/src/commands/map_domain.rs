//! `turboship map-domain <name> --domain <host>`: attach a custom domain.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;

/// Arguments for the map-domain command.
#[derive(Args)]
pub struct MapDomainArgs {
    /// Application name
    pub name: String,

    /// Domain to route to the application (prompted when omitted)
    #[arg(long)]
    pub domain: Option<String>,
}

/// Run `turboship map-domain`.
///
/// # Errors
///
/// Returns an error if the domain is invalid, the application does not exist,
/// or nginx rejects the new site.
pub async fn run(app: &AppContext, args: MapDomainArgs) -> Result<ExitCode> {
    let domain = match args.domain {
        Some(domain) => domain,
        None => app.prompt_text("Domain", "--domain")?,
    };
    let reporter = app.reporter();
    let outcome = app
        .lifecycle()
        .map_domain(&args.name, &domain, &reporter)
        .await?;
    drop(reporter);
    app.renderer().domain_mapped(&outcome)?;
    Ok(ExitCode::SUCCESS)
}
