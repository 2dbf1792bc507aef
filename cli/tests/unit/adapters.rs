//! Tests for the host adapters (identity, database, nginx, certbot) against a
//! recording command runner.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use turboship_cli::application::ports::{DatabaseProbe, ResourceProvisioner};
use turboship_cli::domain::error::ProvisionError;
use turboship_cli::infra::certbot::CertbotCertificate;
use turboship_cli::infra::database::SqlDatabase;
use turboship_cli::infra::identity::SystemIdentity;
use turboship_cli::infra::nginx::NginxRoute;
use turboship_common::{DbType, Subsystem};

use crate::helpers::{MemoryFs, RecordingRunner, active_app, err_output, ok_output, spec_for};

// ── Identity ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn identity_creates_missing_account_and_directories() {
    let runner = RecordingRunner::with(|program, _| match program {
        "id" => err_output(1, b"id: 'acme_sftp': no such user"),
        _ => ok_output(b""),
    });
    let identity = SystemIdentity::new(&runner, "/usr/sbin/nologin", "www-data");
    let spec = spec_for(&active_app("acme", 3000));

    identity.ensure(&spec).await.unwrap();

    let lines = runner.lines();
    assert_eq!(lines[0], "id -u acme_sftp");
    assert_eq!(
        lines[1],
        "useradd -m -d /var/www/acme_sftp -s /usr/sbin/nologin -G www-data acme_sftp"
    );
    assert_eq!(lines[2], "usermod -aG www-data acme_sftp");
    let chpasswd = &runner.calls()[3];
    assert_eq!(chpasswd.program, "chpasswd");
    assert_eq!(chpasswd.stdin_text(), "acme_sftp:IdentityPass1234");
    assert!(!chpasswd.args.iter().any(|a| a.contains("IdentityPass1234")));
    assert!(lines.contains(
        &"install -d -o acme_sftp -g www-data -m 2775 /var/www/acme_sftp/htdocs".to_string()
    ));
    assert!(lines.iter().any(|l| l.ends_with("htdocs/.well-known/acme-challenge")));
}

#[tokio::test]
async fn identity_ensure_is_idempotent_for_existing_account() {
    let runner = RecordingRunner::ok();
    let identity = SystemIdentity::new(&runner, "/usr/sbin/nologin", "www-data");
    identity.ensure(&spec_for(&active_app("acme", 3000))).await.unwrap();
    assert!(!runner.lines().iter().any(|l| l.starts_with("useradd")));
    // Password is still reset so the registry stays authoritative.
    assert!(runner.calls().iter().any(|c| c.program == "chpasswd"));
}

#[tokio::test]
async fn identity_failure_names_the_command() {
    let runner = RecordingRunner::with(|program, _| match program {
        "id" => err_output(1, b""),
        "useradd" => err_output(9, b"useradd: group 'www-data' does not exist"),
        _ => ok_output(b""),
    });
    let identity = SystemIdentity::new(&runner, "/usr/sbin/nologin", "www-data");
    let err = identity
        .ensure(&spec_for(&active_app("acme", 3000)))
        .await
        .unwrap_err();
    assert_eq!(err.subsystem(), Subsystem::Identity);
    let text = err.to_string();
    assert!(text.contains("useradd exited with status 9"));
    assert!(text.contains("group 'www-data' does not exist"));
}

#[tokio::test]
async fn identity_release_of_absent_account_only_removes_home() {
    let runner = RecordingRunner::with(|program, _| match program {
        "id" => err_output(1, b""),
        _ => ok_output(b""),
    });
    let identity = SystemIdentity::new(&runner, "/usr/sbin/nologin", "www-data");
    identity.release(&spec_for(&active_app("acme", 3000))).await.unwrap();
    assert_eq!(
        runner.lines(),
        vec![
            "id -u acme_sftp",
            "rm -rf --one-file-system -- /var/www/acme_sftp",
        ]
    );
}

#[tokio::test]
async fn identity_release_tolerates_userdel_leftovers() {
    let runner = RecordingRunner::with(|program, _| match program {
        "userdel" => err_output(12, b"userdel: acme_sftp home directory not removed"),
        _ => ok_output(b""),
    });
    let identity = SystemIdentity::new(&runner, "/usr/sbin/nologin", "www-data");
    identity.release(&spec_for(&active_app("acme", 3000))).await.unwrap();
    assert!(runner.lines().iter().any(|l| l.starts_with("rm -rf")));
}

// ── Database ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mariadb_script_goes_over_stdin() {
    let runner = RecordingRunner::ok();
    let db = SqlDatabase::new(&runner, "mysql", "postgres");
    db.ensure(&spec_for(&active_app("acme", 3000))).await.unwrap();

    let call = &runner.calls()[0];
    assert_eq!(call.line(), "mysql -u root");
    let script = call.stdin_text();
    assert!(script.contains("CREATE DATABASE IF NOT EXISTS `acme_db`"));
    assert!(script.contains("'acme_dbu'@'%' IDENTIFIED BY 'DatabasePass5678'"));
}

#[tokio::test]
async fn postgres_runs_as_cluster_superuser() {
    let runner = RecordingRunner::ok();
    let db = SqlDatabase::new(&runner, "mysql", "postgres");
    let mut app = active_app("acme", 3000);
    app.db_type = DbType::Postgres;
    db.ensure(&spec_for(&app)).await.unwrap();

    let call = &runner.calls()[0];
    assert_eq!(call.line(), "sudo -u postgres psql -v ON_ERROR_STOP=1 -q");
    assert!(call.stdin_text().contains("CREATE ROLE \"acme_dbu\""));
}

#[tokio::test]
async fn database_release_drops_database_and_user() {
    let runner = RecordingRunner::ok();
    let db = SqlDatabase::new(&runner, "mysql", "postgres");
    db.release(&spec_for(&active_app("acme", 3000))).await.unwrap();
    let script = runner.calls()[0].stdin_text();
    assert!(script.contains("DROP DATABASE IF EXISTS `acme_db`"));
    assert!(script.contains("DROP USER IF EXISTS 'acme_dbu'@'%'"));
}

#[tokio::test]
async fn database_failure_carries_client_complaint() {
    let runner = RecordingRunner::with(|_, _| {
        err_output(1, b"ERROR 2002 (HY000): Can't connect to local server through socket")
    });
    let db = SqlDatabase::new(&runner, "mysql", "postgres");
    let err = db.ensure(&spec_for(&active_app("acme", 3000))).await.unwrap_err();
    assert_eq!(err.subsystem(), Subsystem::Database);
    assert!(err.to_string().contains("Can't connect"));
}

#[tokio::test]
async fn login_check_passes_password_through_environment() {
    let runner = RecordingRunner::ok();
    let db = SqlDatabase::new(&runner, "mysql", "postgres");
    db.check_login(&spec_for(&active_app("acme", 3000))).await.unwrap();

    let call = &runner.calls()[0];
    assert_eq!(call.env, vec![("MYSQL_PWD".to_string(), "DatabasePass5678".to_string())]);
    assert!(!call.args.iter().any(|a| a.contains("DatabasePass5678")));
}

#[tokio::test]
async fn login_check_reports_denied_access() {
    let runner = RecordingRunner::with(|_, _| {
        err_output(1, b"ERROR 1045 (28000): Access denied for user 'acme_dbu'")
    });
    let db = SqlDatabase::new(&runner, "mysql", "postgres");
    let err = db
        .check_login(&spec_for(&active_app("acme", 3000)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Access denied"));
}

// ── Nginx ────────────────────────────────────────────────────────────────────

fn nginx<'a>(runner: &'a RecordingRunner, fs: &'a MemoryFs) -> NginxRoute<&'a RecordingRunner, &'a MemoryFs> {
    NginxRoute::new(
        runner,
        fs,
        PathBuf::from("/etc/nginx/sites-available"),
        PathBuf::from("/etc/nginx/sites-enabled"),
        PathBuf::from("/etc/letsencrypt/live"),
    )
}

#[tokio::test]
async fn nginx_writes_links_validates_and_reloads() {
    let runner = RecordingRunner::ok();
    let fs = MemoryFs::default();
    let route = nginx(&runner, &fs);
    let spec = spec_for(&active_app("acme", 3000)).with_tls(false);

    route.ensure(&spec).await.unwrap();

    let site = route.site_path("acme");
    assert_eq!(site, Path::new("/etc/nginx/sites-available/turboship-acme.conf"));
    let text = fs.file(&site).expect("site written");
    assert!(text.contains("server_name acme.203.0.113.7.sslip.io;"));
    assert!(text.contains("127.0.0.1:3000"));
    assert_eq!(fs.link_target(&route.link_path("acme")), Some(site));
    assert_eq!(runner.lines(), vec!["nginx -t", "systemctl reload nginx"]);
}

#[tokio::test]
async fn nginx_unchanged_site_is_not_reloaded() {
    let runner = RecordingRunner::ok();
    let fs = MemoryFs::default();
    let route = nginx(&runner, &fs);
    let spec = spec_for(&active_app("acme", 3000));

    route.ensure(&spec).await.unwrap();
    route.ensure(&spec).await.unwrap();
    assert_eq!(runner.lines().len(), 2);
}

#[tokio::test]
async fn nginx_rejected_site_restores_previous_file() {
    let runner = RecordingRunner::with(|program, _| match program {
        "nginx" => err_output(1, b"nginx: [emerg] unknown directive \"sever\""),
        _ => ok_output(b""),
    });
    let fs = MemoryFs::default();
    let route = nginx(&runner, &fs);
    let site = route.site_path("acme");
    let link = route.link_path("acme");
    fs.put(&site, "# previous configuration\n");
    fs.put_link(&site, &link);

    let err = route
        .ensure(&spec_for(&active_app("acme", 3000)))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::ConfigInvalid { subsystem: Subsystem::Route, .. }));
    assert!(err.to_string().contains("unknown directive"));
    assert_eq!(fs.file(&site).as_deref(), Some("# previous configuration\n"));
    assert!(fs.link_target(&link).is_some());
    assert!(!runner.lines().iter().any(|l| l.starts_with("systemctl")));
}

#[tokio::test]
async fn nginx_rejected_new_site_leaves_nothing_behind() {
    let runner = RecordingRunner::with(|program, _| match program {
        "nginx" => err_output(1, b"nginx: configuration file test failed"),
        _ => ok_output(b""),
    });
    let fs = MemoryFs::default();
    let route = nginx(&runner, &fs);

    route
        .ensure(&spec_for(&active_app("acme", 3000)))
        .await
        .unwrap_err();

    assert!(fs.file(&route.site_path("acme")).is_none());
    assert!(fs.link_target(&route.link_path("acme")).is_none());
}

#[tokio::test]
async fn nginx_release_removes_files_and_is_idempotent() {
    let runner = RecordingRunner::ok();
    let fs = MemoryFs::default();
    let route = nginx(&runner, &fs);
    let spec = spec_for(&active_app("acme", 3000));
    route.ensure(&spec).await.unwrap();

    route.release(&spec).await.unwrap();
    assert!(fs.file(&route.site_path("acme")).is_none());
    assert!(fs.link_target(&route.link_path("acme")).is_none());
    let reloads = runner.lines().iter().filter(|l| l.starts_with("systemctl")).count();
    assert_eq!(reloads, 2);

    route.release(&spec).await.unwrap();
    let reloads = runner.lines().iter().filter(|l| l.starts_with("systemctl")).count();
    assert_eq!(reloads, 2);
}

// ── Certbot ──────────────────────────────────────────────────────────────────

#[test]
fn certbot_requests_every_domain_in_one_lineage() {
    let runner = RecordingRunner::ok();
    let certbot = CertbotCertificate::new(&runner, None, 0, true);
    let mut app = active_app("acme", 3000);
    app.real_domain = Some("acme.example.com".into());

    let args = certbot.issue_args(&spec_for(&app)).join(" ");
    assert!(args.starts_with("certonly --webroot -w /var/www/acme_sftp/htdocs --cert-name acme"));
    assert!(args.contains("-m admin@acme.203.0.113.7.sslip.io"));
    assert!(args.contains("--staging"));
    assert!(args.ends_with("-d acme.203.0.113.7.sslip.io -d acme.example.com"));
}

#[tokio::test]
async fn certbot_retries_then_succeeds() {
    let attempts = AtomicU32::new(0);
    let runner = RecordingRunner::with(move |_, _| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            err_output(1, b"Timeout during connect (likely firewall problem)")
        } else {
            ok_output(b"Successfully received certificate.")
        }
    });
    let certbot = CertbotCertificate::new(&runner, Some("ops@example.com".into()), 1, false)
        .with_retry_delay(Duration::ZERO);

    certbot.ensure(&spec_for(&active_app("acme", 3000))).await.unwrap();
    assert_eq!(runner.calls().len(), 2);
    assert!(runner.lines()[0].contains("-m ops@example.com"));
}

#[tokio::test]
async fn certbot_gives_up_after_retries() {
    let runner = RecordingRunner::with(|_, _| err_output(1, b"too many certificates already issued"));
    let certbot =
        CertbotCertificate::new(&runner, None, 2, false).with_retry_delay(Duration::ZERO);

    let err = certbot
        .ensure(&spec_for(&active_app("acme", 3000)))
        .await
        .unwrap_err();
    assert_eq!(runner.calls().len(), 3);
    assert_eq!(err.subsystem(), Subsystem::Certificate);
    assert!(err.to_string().contains("too many certificates"));
}

#[tokio::test]
async fn certbot_release_tolerates_missing_lineage() {
    let runner = RecordingRunner::with(|_, _| {
        err_output(1, b"No certificate found with name acme (expected /etc/letsencrypt/renewal/acme.conf).")
    });
    let certbot = CertbotCertificate::new(&runner, None, 0, false);
    certbot.release(&spec_for(&active_app("acme", 3000))).await.unwrap();
    assert_eq!(
        runner.lines(),
        vec!["certbot delete --cert-name acme --non-interactive"]
    );
}
