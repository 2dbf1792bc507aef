//! `turboship delete <name>`: release every resource and drop the row.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::AppArg;

/// Run `turboship delete`.
///
/// # Errors
///
/// Returns an error if the application does not exist or the registry cannot
/// be updated. Failures releasing individual resources are reported, not
/// returned.
pub async fn run(app: &AppContext, args: &AppArg) -> Result<ExitCode> {
    let lifecycle = app.lifecycle();
    let existing = lifecycle.info(&args.name).await?;

    if !app.output.quiet {
        println!();
        println!("This will permanently remove '{}':", existing.name);
        println!("  • account {} and everything under its home", existing.identity_user);
        println!("  • {} database {}", existing.db_type, existing.db_name);
        println!("  • site and certificate for {}", existing.domains().join(", "));
        println!();
    }
    if !app.non_interactive && !app.confirm("Continue?", false)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let reporter = app.reporter();
    let report = lifecycle.delete(&args.name, &reporter).await?;
    drop(reporter);

    app.renderer().deleted(&report)?;
    Ok(ExitCode::SUCCESS)
}
