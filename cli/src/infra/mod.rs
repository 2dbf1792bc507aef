//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! registry file and its SQLite predecessor, the allocation lock, host provisioners, and network probes.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod certbot;
pub mod command_runner;
pub mod config;
pub mod database;
pub mod fs;
pub mod identity;
pub mod legacy;
pub mod lock;
pub mod network;
pub mod nginx;
pub mod registry;
