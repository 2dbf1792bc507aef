//! Import from the SQLite registry kept by turboship 0.7 and earlier.
//!
//! Those releases stored one row per application in the `apps` table of
//! `/opt/turboship/turboship.db` and tracked neither backend ports nor
//! provisioning progress. Imported rows get ports lowest-free in name order
//! and are marked active, since the old tool only recorded finished apps.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use turboship_common::{Application, DbType, Progress, ProvisionState, naming};

use crate::domain::allocation::{PortRange, lowest_free_port};
use crate::domain::error::LifecycleError;

/// Where turboship 0.7 kept its registry.
pub const LEGACY_DB_PATH: &str = "/opt/turboship/turboship.db";

const SELECT_APPS: &str = "SELECT app, temp_domain, real_domain, db_type, db_name, db_user, \
     db_pass, sftp_user, sftp_pass, created_at FROM apps ORDER BY app";

/// One `apps` row. Only `app` and `temp_domain` were always written.
#[derive(Debug)]
struct LegacyRow {
    app: String,
    temp_domain: String,
    real_domain: Option<String>,
    db_type: Option<String>,
    db_name: Option<String>,
    db_user: Option<String>,
    db_pass: Option<String>,
    sftp_user: Option<String>,
    sftp_pass: Option<String>,
    created_at: Option<String>,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LegacyRow> {
    Ok(LegacyRow {
        app: row.get(0)?,
        temp_domain: row.get(1)?,
        real_domain: row.get(2)?,
        db_type: row.get(3)?,
        db_name: row.get(4)?,
        db_user: row.get(5)?,
        db_pass: row.get(6)?,
        sftp_user: row.get(7)?,
        sftp_pass: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Read every application from the SQLite registry at `path`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or queried, a row names
/// an unknown database engine, or `ports` cannot hold every row.
pub fn import_sqlite(path: &Path, ports: PortRange) -> Result<Vec<Application>> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("opening legacy registry {}", path.display()))?;
    let mut stmt = conn
        .prepare(SELECT_APPS)
        .with_context(|| format!("reading apps table of {}", path.display()))?;
    let rows = stmt
        .query_map([], map_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("reading apps table of {}", path.display()))?;

    let mut used = BTreeSet::new();
    let mut apps = Vec::with_capacity(rows.len());
    for row in rows {
        let port = lowest_free_port(&used, ports).ok_or(LifecycleError::AllocationExhausted {
            base: ports.base,
            max: ports.max,
        })?;
        used.insert(port);
        apps.push(convert(row, port)?);
    }
    tracing::info!(path = %path.display(), rows = apps.len(), "imported legacy registry");
    Ok(apps)
}

fn convert(row: LegacyRow, port: u16) -> Result<Application> {
    let db_type = parse_db_type(row.db_type.as_deref())
        .with_context(|| format!("legacy row '{}'", row.app))?;
    let name = row.app;
    Ok(Application {
        identity_user: row.sftp_user.unwrap_or_else(|| naming::identity_user(&name)),
        identity_password: row.sftp_pass.unwrap_or_default(),
        db_type,
        db_name: row.db_name.unwrap_or_else(|| naming::db_name(&name)),
        db_user: row.db_user.unwrap_or_else(|| naming::db_user(&name)),
        db_password: row.db_pass.unwrap_or_default(),
        temp_domain: row.temp_domain,
        real_domain: row.real_domain.filter(|d| !d.trim().is_empty()),
        port,
        created_at: parse_created_at(row.created_at.as_deref()),
        progress: Progress {
            state: ProvisionState::Active,
            tls: false,
            failure: None,
        },
        name,
    })
}

fn parse_db_type(value: Option<&str>) -> Result<DbType> {
    match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("mariadb" | "mysql") => Ok(DbType::Mariadb),
        Some("postgres" | "postgresql") => Ok(DbType::Postgres),
        other => anyhow::bail!("unknown database type {other:?}"),
    }
}

/// The old tool stored local `isoformat()` timestamps without an offset.
fn parse_created_at(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|t| t.with_timezone(&Utc))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.and_utc())
                })
                .ok()
        })
        .unwrap_or_else(Utc::now)
}
