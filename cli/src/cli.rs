//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::infra::config::YamlConfigStore;

/// Provision isolated hosted-application environments on one server
#[derive(Parser)]
#[command(
    name = "turboship",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision a new application (or resume an unfinished one)
    Create(commands::create::CreateArgs),

    /// Remove an application and every resource it owns
    Delete(commands::AppArg),

    /// List applications
    List,

    /// Show an application's endpoints and credentials
    Info(commands::AppArg),

    /// Check DNS, backend port and database login
    Test(commands::AppArg),

    /// Route a custom domain to an application
    MapDomain(commands::map_domain::MapDomainArgs),

    /// Re-run every provisioning step for an application
    Repair(commands::AppArg),

    /// Issue the certificate and enable HTTPS
    InstallSsl(commands::AppArg),

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the command
    /// fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
            ..
        } = self;
        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        };
        let app = AppContext::new(&flags, &YamlConfigStore)?;

        match command {
            Command::Create(args) => commands::create::run(&app, args).await,
            Command::Delete(args) => commands::delete::run(&app, &args).await,
            Command::List => commands::list::run(&app).await,
            Command::Info(args) => commands::info::run(&app, &args).await,
            Command::Test(args) => commands::test::run(&app, &args).await,
            Command::MapDomain(args) => commands::map_domain::run(&app, args).await,
            Command::Repair(args) => commands::repair::run(&app, &args).await,
            Command::InstallSsl(args) => commands::install_ssl::run(&app, &args).await,
            Command::Config(cmd) => commands::config::run(&app, &cmd),
        }
    }
}
