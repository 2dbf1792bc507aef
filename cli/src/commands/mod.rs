//! Command implementations

pub mod config;
pub mod create;
pub mod delete;
pub mod info;
pub mod install_ssl;
pub mod list;
pub mod map_domain;
pub mod repair;

use clap::Args;

/// An application name as the only argument.
#[derive(Args)]
pub struct AppArg {
    /// Application name
    pub name: String,
}
