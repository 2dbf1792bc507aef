//! Network infrastructure: implements `NetworkProbe` and `PublicIpResolver`
//! using `spawn_blocking`.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{NetworkProbe, PublicIpResolver};

/// Production implementation that performs real network checks.
pub struct TokioNetworkProbe;

impl NetworkProbe for TokioNetworkProbe {
    async fn check_tcp_connectivity(&self, host: &str, port: u16) -> Result<bool> {
        let addr = format!("{host}:{port}");
        let result = tokio::task::spawn_blocking(move || {
            let addr: std::net::SocketAddr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid address {addr}: {e}"))?;
            Ok::<bool, anyhow::Error>(
                std::net::TcpStream::connect_timeout(&addr, Duration::from_secs(3)).is_ok(),
            )
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking panicked: {e}"))??;
        Ok(result)
    }

    async fn resolve_host(&self, hostname: &str) -> Result<Vec<IpAddr>> {
        let addr = format!("{hostname}:443");
        let result = tokio::task::spawn_blocking(move || {
            use std::net::ToSocketAddrs;
            let mut ips: Vec<IpAddr> = addr
                .to_socket_addrs()
                .map(|addrs| addrs.map(|a| a.ip()).collect())
                .unwrap_or_default();
            ips.dedup();
            ips
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking panicked: {e}"))?;
        Ok(result)
    }
}

/// Looks the address up from a plain-text "what is my IP" endpoint.
pub struct HttpIpResolver {
    url: String,
}

impl HttpIpResolver {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PublicIpResolver for HttpIpResolver {
    async fn public_ip(&self) -> Result<IpAddr> {
        let url = self.url.clone();
        tokio::task::spawn_blocking(move || {
            let req = ureq::get(&url)
                .set("User-Agent", concat!("turboship/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(10));
            let body = match req.call() {
                Ok(resp) => resp.into_string().context("reading response")?,
                Err(ureq::Error::Status(code, _)) => {
                    anyhow::bail!("public IP lookup at {url} failed: HTTP {code}")
                }
                Err(e) => anyhow::bail!(
                    "public IP lookup at {url} failed: {e}\n\nSet public_ip in the config file to skip the lookup."
                ),
            };
            parse_ip(&body).with_context(|| format!("unexpected response from {url}"))
        })
        .await
        .context("IP lookup task panicked")?
    }
}

/// Configured address; no lookup.
pub struct StaticIpResolver(pub IpAddr);

impl PublicIpResolver for StaticIpResolver {
    async fn public_ip(&self) -> Result<IpAddr> {
        Ok(self.0)
    }
}

/// Resolver chosen from configuration: the fixed `public_ip` when set,
/// otherwise a lookup.
pub enum ConfiguredIpResolver {
    Fixed(StaticIpResolver),
    Lookup(HttpIpResolver),
}

impl ConfiguredIpResolver {
    #[must_use]
    pub fn new(fixed: Option<IpAddr>, lookup_url: &str) -> Self {
        match fixed {
            Some(ip) => Self::Fixed(StaticIpResolver(ip)),
            None => Self::Lookup(HttpIpResolver::new(lookup_url)),
        }
    }
}

impl PublicIpResolver for ConfiguredIpResolver {
    async fn public_ip(&self) -> Result<IpAddr> {
        match self {
            Self::Fixed(r) => r.public_ip().await,
            Self::Lookup(r) => r.public_ip().await,
        }
    }
}

fn parse_ip(body: &str) -> Result<IpAddr> {
    let trimmed = body.trim();
    trimmed
        .parse()
        .map_err(|e| anyhow::anyhow!("'{trimmed}' is not an IP address: {e}"))
}
