//! Identifiers derived from an application name.
//!
//! Every function here is pure: the same name always yields the same
//! identifiers, which is what makes name uniqueness sufficient for the
//! uniqueness of OS users, databases, and database accounts.

use std::net::IpAddr;

/// OS account used for file transfer, e.g. `acme_sftp`.
#[must_use]
pub fn identity_user(name: &str) -> String {
    format!("{name}_sftp")
}

/// Database name, e.g. `acme_db`.
#[must_use]
pub fn db_name(name: &str) -> String {
    format!("{name}_db")
}

/// Database account name, e.g. `acme_dbu`.
#[must_use]
pub fn db_user(name: &str) -> String {
    format!("{name}_dbu")
}

/// DNS label for the application: lowercase, underscores become dashes.
///
/// Distinct names can share a label (`my_app`, `My-App`); the registry
/// refuses the second one.
#[must_use]
pub fn host_label(name: &str) -> String {
    name.to_ascii_lowercase().replace('_', "-")
}

/// Fallback hostname resolved by sslip.io, e.g. `acme.203.0.113.7.sslip.io`.
///
/// IPv6 addresses are written with dashes in place of colons, the form
/// sslip.io understands.
#[must_use]
pub fn temp_domain(name: &str, ip: IpAddr) -> String {
    let ip_part = match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6.to_string().replace(':', "-"),
    };
    format!("{}.{ip_part}.sslip.io", host_label(name))
}
