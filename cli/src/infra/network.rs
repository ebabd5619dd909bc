//! Network infrastructure: implements `NameResolver`.
//!
//! Lookups go to a public resolver rather than the host's own, so the
//! answer reflects what the rest of the internet sees, not the zones this
//! host is about to serve.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;

use crate::application::ports::NameResolver;

/// Plain-text echo of the caller's address.
pub const ADDRESS_ECHO_URL: &str = "https://api.ipify.org";

const ECHO_TIMEOUT: Duration = Duration::from_secs(10);

/// Production resolver backed by hickory and a public upstream.
pub struct PublicResolver {
    resolver: TokioAsyncResolver,
    echo_url: String,
}

impl PublicResolver {
    #[must_use]
    pub fn new() -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 2;
        // Uncached: each check sees the records as currently published.
        opts.cache_size = 0;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::google(), opts),
            echo_url: ADDRESS_ECHO_URL.to_string(),
        }
    }
}

impl Default for PublicResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NameResolver for PublicResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        match self.resolver.lookup_ip(name).await {
            Ok(lookup) => {
                let addrs: Vec<IpAddr> = lookup.iter().collect();
                tracing::debug!(name, ?addrs, "resolved");
                Ok(addrs)
            }
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                tracing::debug!(name, "no records");
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("resolving {name}")),
        }
    }

    async fn public_address(&self) -> Result<IpAddr> {
        let url = self.echo_url.clone();
        let body = tokio::task::spawn_blocking(move || {
            ureq::get(&url)
                .timeout(ECHO_TIMEOUT)
                .call()
                .with_context(|| format!("querying {url}"))?
                .into_string()
                .context("reading address echo")
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking panicked: {e}"))??;
        body.trim()
            .parse()
            .with_context(|| format!("address echo returned '{}'", body.trim()))
    }
}
