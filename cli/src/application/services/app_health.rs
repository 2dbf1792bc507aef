//! Application service: health checks for a provisioned application.
//!
//! Read-only: takes no lock and changes nothing.

use std::net::IpAddr;
use std::path::Path;

use anyhow::Result;

use crate::application::ports::{DatabaseProbe, NetworkProbe, RegistryStore};
use crate::domain::application::{AppSpec, validate_app_name};
use crate::domain::health::{CheckResult, HealthReport};

/// Check DNS for every domain, the backend port, and the database login.
///
/// With `server_ip`, a hostname passes only when it resolves to that address.
/// Without it, resolving at all is enough.
///
/// # Errors
///
/// Returns `Validation` or `NotFound` for the name. Individual check
/// failures are recorded in the report.
pub async fn check_app(
    store: &impl RegistryStore,
    network: &impl NetworkProbe,
    database: &impl DatabaseProbe,
    www_root: &Path,
    server_ip: Option<IpAddr>,
    name: &str,
) -> Result<HealthReport> {
    validate_app_name(name)?;
    let app = store.get(name).await?;
    let spec = AppSpec::from_application(&app, www_root);

    let mut dns = Vec::with_capacity(spec.domains.len());
    for domain in &spec.domains {
        let label = format!("dns {domain}");
        dns.push(match network.resolve_host(domain).await {
            Ok(ips) if ips.is_empty() => CheckResult::fail(label, "does not resolve"),
            Ok(ips) => match server_ip {
                Some(ip) if !ips.contains(&ip) => CheckResult::fail(
                    label,
                    format!("resolves to {}, not this server ({ip})", join_ips(&ips)),
                ),
                _ => CheckResult::pass(label),
            },
            Err(e) => CheckResult::fail(label, e.to_string()),
        });
    }

    let label = format!("backend 127.0.0.1:{}", spec.port);
    let backend = match network.check_tcp_connectivity("127.0.0.1", spec.port).await {
        Ok(true) => CheckResult::pass(label),
        Ok(false) => CheckResult::fail(label, "nothing is listening"),
        Err(e) => CheckResult::fail(label, e.to_string()),
    };

    let label = format!("{} login as {}", spec.db_type, spec.db_user);
    let database = match database.check_login(&spec).await {
        Ok(()) => CheckResult::pass(label),
        Err(e) => CheckResult::fail(label, format!("{e:#}")),
    };

    let report = HealthReport {
        app: app.name,
        dns,
        backend,
        database,
    };
    tracing::debug!(app = %report.app, ok = report.all_ok(), "health checked");
    Ok(report)
}

fn join_ips(ips: &[IpAddr]) -> String {
    ips.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
