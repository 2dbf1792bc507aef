//! Reverse-proxy site rendering.
//!
//! Pure generator: takes an [`AppSpec`] and returns the nginx site file text.
//! The adapter in `infra::nginx` owns writing, validating and reloading it.

use std::fmt::Write as _;
use std::path::Path;

use crate::domain::application::AppSpec;

/// Certificate file locations for an application's certificate lineage.
#[must_use]
pub fn certificate_paths(live_dir: &Path, cert_name: &str) -> (String, String) {
    let lineage = live_dir.join(cert_name);
    (
        lineage.join("fullchain.pem").display().to_string(),
        lineage.join("privkey.pem").display().to_string(),
    )
}

/// Render the nginx site configuration for `spec`.
///
/// Plaintext always serves ACME challenges from the static root. Without TLS
/// the plaintext server also serves the application; with TLS it redirects to
/// HTTPS and a second `443 ssl` server carries the application.
#[must_use]
pub fn render_site(spec: &AppSpec, live_dir: &Path) -> String {
    let server_names = spec.domains.join(" ");
    let web_root = spec.web_root().display().to_string();
    let logs_dir = spec.logs_dir().display().to_string();

    let mut out = String::new();
    let _ = writeln!(out, "# Managed by turboship for application '{}'.", spec.name);
    let _ = writeln!(out, "# Local edits are overwritten on the next provisioning run.");
    out.push('\n');

    out.push_str("server {\n");
    out.push_str("    listen 80;\n");
    out.push_str("    listen [::]:80;\n");
    let _ = writeln!(out, "    server_name {server_names};");
    out.push('\n');
    push_acme_location(&mut out, &web_root);
    if spec.tls {
        out.push('\n');
        out.push_str("    location / {\n");
        out.push_str("        return 301 https://$host$request_uri;\n");
        out.push_str("    }\n");
    } else {
        push_app_body(&mut out, spec, &web_root, &logs_dir);
    }
    out.push_str("}\n");

    if spec.tls {
        let (fullchain, privkey) = certificate_paths(live_dir, &spec.name);
        out.push('\n');
        out.push_str("server {\n");
        out.push_str("    listen 443 ssl;\n");
        out.push_str("    listen [::]:443 ssl;\n");
        let _ = writeln!(out, "    server_name {server_names};");
        out.push('\n');
        let _ = writeln!(out, "    ssl_certificate {fullchain};");
        let _ = writeln!(out, "    ssl_certificate_key {privkey};");
        out.push_str("    ssl_protocols TLSv1.2 TLSv1.3;\n");
        out.push('\n');
        push_acme_location(&mut out, &web_root);
        push_app_body(&mut out, spec, &web_root, &logs_dir);
        out.push_str("}\n");
    }

    out
}

fn push_acme_location(out: &mut String, web_root: &str) {
    out.push_str("    location ^~ /.well-known/acme-challenge/ {\n");
    out.push_str("        allow all;\n");
    out.push_str("        default_type \"text/plain\";\n");
    let _ = writeln!(out, "        root {web_root};");
    out.push_str("    }\n");
}

fn push_app_body(out: &mut String, spec: &AppSpec, web_root: &str, logs_dir: &str) {
    out.push('\n');
    let _ = writeln!(out, "    root {web_root};");
    out.push_str("    index index.html;\n");
    let _ = writeln!(out, "    access_log {logs_dir}/access.log;");
    let _ = writeln!(out, "    error_log {logs_dir}/error.log;");
    out.push('\n');
    out.push_str("    location /api/ {\n");
    let _ = writeln!(out, "        proxy_pass http://127.0.0.1:{}/;", spec.port);
    out.push_str("        proxy_http_version 1.1;\n");
    out.push_str("        proxy_set_header Upgrade $http_upgrade;\n");
    out.push_str("        proxy_set_header Connection 'upgrade';\n");
    out.push_str("        proxy_set_header Host $host;\n");
    out.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
    out.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");
    out.push_str("        proxy_cache_bypass $http_upgrade;\n");
    out.push_str("    }\n");
    out.push('\n');
    out.push_str("    location / {\n");
    out.push_str("        try_files $uri $uri/ =404;\n");
    out.push_str("    }\n");
    out.push('\n');
    out.push_str("    add_header X-Frame-Options \"SAMEORIGIN\";\n");
    out.push_str("    add_header X-Content-Type-Options \"nosniff\";\n");
}
