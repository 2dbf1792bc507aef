//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`
//! sockets. All functions are synchronous and take data in, returning data out.

pub mod allocation;
pub mod application;
pub mod config;
pub mod credentials;
pub mod error;
pub mod health;
pub mod route;
pub mod sql;

pub use allocation::{PortRange, lowest_free_port};
pub use application::{AppSpec, normalize_domain, validate_app_name};
pub use config::TurboshipConfig;
pub use credentials::random_secret;
pub use error::{ConfigError, LifecycleError, ProvisionError};
pub use health::{CheckResult, HealthReport};
