//! `turboship config`: inspect host configuration.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration and where it was read from
    Show,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be rendered.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            app.renderer().config(&app.config, &app.config_path)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
