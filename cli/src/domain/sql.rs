//! Idempotent DDL for the two database families.
//!
//! Identifiers come from validated application names (`[A-Za-z0-9_-]`) and
//! passwords from the alphanumeric secret generator, so quoting is enough and
//! no escaping is needed. The scripts are fed to the client on stdin.

use turboship_common::DbType;

/// DDL creating the database and an account scoped to it.
#[must_use]
pub fn provision_script(db_type: DbType, db_name: &str, db_user: &str, password: &str) -> String {
    match db_type {
        DbType::Mariadb => format!(
            "CREATE DATABASE IF NOT EXISTS `{db_name}`;\n\
             CREATE USER IF NOT EXISTS '{db_user}'@'%' IDENTIFIED BY '{password}';\n\
             ALTER USER '{db_user}'@'%' IDENTIFIED BY '{password}';\n\
             GRANT ALL PRIVILEGES ON `{db_name}`.* TO '{db_user}'@'%';\n\
             FLUSH PRIVILEGES;\n"
        ),
        // CREATE DATABASE cannot run inside a DO block, hence \gexec.
        DbType::Postgres => format!(
            "DO $$\n\
             BEGIN\n\
             \x20   IF NOT EXISTS (SELECT FROM pg_roles WHERE rolname = '{db_user}') THEN\n\
             \x20       CREATE ROLE \"{db_user}\" LOGIN PASSWORD '{password}';\n\
             \x20   ELSE\n\
             \x20       ALTER ROLE \"{db_user}\" WITH LOGIN PASSWORD '{password}';\n\
             \x20   END IF;\n\
             END\n\
             $$;\n\
             SELECT 'CREATE DATABASE \"{db_name}\" OWNER \"{db_user}\"'\n\
             WHERE NOT EXISTS (SELECT FROM pg_database WHERE datname = '{db_name}')\\gexec\n\
             REVOKE ALL ON DATABASE \"{db_name}\" FROM PUBLIC;\n\
             GRANT ALL PRIVILEGES ON DATABASE \"{db_name}\" TO \"{db_user}\";\n"
        ),
    }
}

/// DDL dropping the database and its account, tolerating absence.
#[must_use]
pub fn teardown_script(db_type: DbType, db_name: &str, db_user: &str) -> String {
    match db_type {
        DbType::Mariadb => format!(
            "DROP DATABASE IF EXISTS `{db_name}`;\n\
             DROP USER IF EXISTS '{db_user}'@'%';\n\
             FLUSH PRIVILEGES;\n"
        ),
        DbType::Postgres => format!(
            "DROP DATABASE IF EXISTS \"{db_name}\";\n\
             DROP ROLE IF EXISTS \"{db_user}\";\n"
        ),
    }
}
