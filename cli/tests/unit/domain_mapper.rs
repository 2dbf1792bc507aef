//! Tests for `Lifecycle::map_domain`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use turboship_cli::application::services::lifecycle::CertificateStatus;
use turboship_cli::domain::error::LifecycleError;
use turboship_common::{ProvisionState, Subsystem};

use crate::helpers::{Harness, NoopReporter, active_app, partial_app};

fn lifecycle_error(err: &anyhow::Error) -> &LifecycleError {
    err.downcast_ref::<LifecycleError>()
        .unwrap_or_else(|| panic!("expected LifecycleError, got: {err:#}"))
}

#[tokio::test]
async fn map_domain_routes_temp_and_real_hostnames() {
    let h = Harness::with_rows(vec![active_app("acme", 3000)]);
    let outcome = h
        .lifecycle()
        .map_domain("acme", "Shop.Example.com.", &NoopReporter)
        .await
        .expect("map-domain");

    assert_eq!(outcome.app.real_domain.as_deref(), Some("shop.example.com"));
    assert!(outcome.certificate.is_issued());
    assert_eq!(
        h.store.row("acme").unwrap().real_domain.as_deref(),
        Some("shop.example.com")
    );

    let route = &h.provisioners.route.specs()[0];
    assert_eq!(
        route.domains,
        vec!["acme.203.0.113.7.sslip.io", "shop.example.com"]
    );
    let cert = &h.provisioners.certificate.specs()[0];
    assert_eq!(cert.domains, route.domains);
}

#[tokio::test]
async fn map_domain_replaces_previous_domain() {
    let mut row = active_app("acme", 3000);
    row.real_domain = Some("old.example.com".into());
    let h = Harness::with_rows(vec![row]);

    h.lifecycle()
        .map_domain("acme", "new.example.com", &NoopReporter)
        .await
        .unwrap();

    let route = &h.provisioners.route.specs()[0];
    assert!(!route.domains.contains(&"old.example.com".to_string()));
    assert_eq!(
        h.store.row("acme").unwrap().real_domain.as_deref(),
        Some("new.example.com")
    );
}

#[tokio::test]
async fn rejected_route_leaves_registry_untouched() {
    let h = Harness::with_rows(vec![active_app("acme", 3000)]);
    h.provisioners.route.fail_ensure(1);

    let err = h
        .lifecycle()
        .map_domain("acme", "shop.example.com", &NoopReporter)
        .await
        .unwrap_err();

    assert!(matches!(
        lifecycle_error(&err),
        LifecycleError::Provision { subsystem: Subsystem::Route, .. }
    ));
    let row = h.store.row("acme").unwrap();
    assert!(row.real_domain.is_none());
    assert!(row.is_active());
    assert!(h.provisioners.certificate.specs().is_empty());
}

#[tokio::test]
async fn certificate_failure_keeps_mapping() {
    let h = Harness::with_rows(vec![active_app("acme", 3000)]);
    h.provisioners.certificate.fail_ensure(2);

    let outcome = h
        .lifecycle()
        .map_domain("acme", "shop.example.com", &NoopReporter)
        .await
        .expect("soft certificate failure");

    assert!(matches!(outcome.certificate, CertificateStatus::Failed(_)));
    assert_eq!(
        h.store.row("acme").unwrap().real_domain.as_deref(),
        Some("shop.example.com")
    );
}

#[tokio::test]
async fn domain_served_by_another_app_is_rejected() {
    let mut alpha = active_app("alpha", 3000);
    alpha.real_domain = Some("shop.example.com".into());
    let h = Harness::with_rows(vec![alpha, active_app("beta", 3001)]);

    let err = h
        .lifecycle()
        .map_domain("beta", "SHOP.example.com", &NoopReporter)
        .await
        .unwrap_err();

    assert!(matches!(
        lifecycle_error(&err),
        LifecycleError::DuplicateKey { key } if key.contains("shop.example.com") && key.contains("alpha")
    ));
    assert!(h.journal().is_empty());
    assert!(h.store.row("beta").unwrap().real_domain.is_none());
}

#[tokio::test]
async fn remapping_own_domain_is_allowed() {
    let mut alpha = active_app("alpha", 3000);
    alpha.real_domain = Some("shop.example.com".into());
    let h = Harness::with_rows(vec![alpha]);

    h.lifecycle()
        .map_domain("alpha", "shop.example.com", &NoopReporter)
        .await
        .expect("same app may re-map its domain");
}

#[tokio::test]
async fn malformed_domain_is_rejected() {
    let h = Harness::with_rows(vec![active_app("acme", 3000)]);
    for bad in ["", "localhost", "-bad.example.com", "spaces in.example.com"] {
        let err = h
            .lifecycle()
            .map_domain("acme", bad, &NoopReporter)
            .await
            .unwrap_err();
        assert!(
            matches!(lifecycle_error(&err), LifecycleError::Validation(_)),
            "{bad:?} should be rejected"
        );
    }
    assert!(h.journal().is_empty());
    assert_eq!(h.lock.count(), 0);
}

#[tokio::test]
async fn sslip_hostname_cannot_be_mapped() {
    let h = Harness::with_rows(vec![active_app("acme", 3000)]);
    let err = h
        .lifecycle()
        .map_domain("acme", "acme.198.51.100.1.sslip.io", &NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(lifecycle_error(&err), LifecycleError::Validation(m) if m.contains("sslip.io")));
}

#[tokio::test]
async fn unknown_app_is_not_found() {
    let h = Harness::new();
    let err = h
        .lifecycle()
        .map_domain("ghost", "shop.example.com", &NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(lifecycle_error(&err), LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn unfinished_app_must_be_repaired_first() {
    let h = Harness::with_rows(vec![partial_app("acme", 3000, ProvisionState::DatabaseReady)]);
    let err = h
        .lifecycle()
        .map_domain("acme", "shop.example.com", &NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(lifecycle_error(&err), LifecycleError::Validation(_)));
    assert!(h.journal().is_empty());
}
