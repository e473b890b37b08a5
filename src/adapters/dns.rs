//! Host resolvers for the URL guard.

use crate::core::url_guard::{classify_str, Ipv6Policy};
use crate::domain::ports::{HostResolver, ResolveError};
use crate::utils::error::{GardenError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Resolves through the operating system (getaddrinfo), which is also what
/// reqwest's default connector uses.
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        debug!("DNS lookup for: {}", host);
        let answers = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ResolveError::Failed(format!("{}: {}", host, e)))?;

        let mut addresses: Vec<IpAddr> = answers.map(|addr| addr.ip()).collect();
        // IPv4 first; the first entry is the one a pinned fetch connects to
        addresses.sort_by_key(|ip| ip.is_ipv6());

        if addresses.is_empty() {
            return Err(ResolveError::NoAddresses(host.to_string()));
        }
        Ok(addresses)
    }
}

/// Fixed host table. Used for configured overrides and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(self, host: &str, address: IpAddr) -> Self {
        self.with_addresses(host, vec![address])
    }

    pub fn with_addresses(mut self, host: &str, addresses: Vec<IpAddr>) -> Self {
        self.hosts.insert(host.to_ascii_lowercase(), addresses);
        self
    }

    /// Builds the table from `host = "address"` pairs, as found in the
    /// `[resolver.hosts]` configuration section.
    pub fn from_table(table: &HashMap<String, String>) -> Result<Self> {
        let mut resolver = Self::new();
        for (host, address) in table {
            let ip = address
                .parse::<IpAddr>()
                .map_err(|e| GardenError::InvalidConfigValueError {
                    field: format!("resolver.hosts.{}", host),
                    value: address.clone(),
                    reason: e.to_string(),
                })?;
            let class = classify_str(address, Ipv6Policy::Classify);
            if !class.is_public() {
                warn!(
                    host = host.as_str(),
                    address = address.as_str(),
                    class = class.as_str(),
                    "static override points at a non-public address; the URL guard will refuse it"
                );
            }
            resolver = resolver.with_host(host, ip);
        }
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        let key = host.trim_end_matches('.').to_ascii_lowercase();
        match self.hosts.get(&key) {
            Some(addresses) if addresses.is_empty() => Err(ResolveError::NoAddresses(key)),
            Some(addresses) => Ok(addresses.clone()),
            None => Err(ResolveError::NotFound(key)),
        }
    }
}

/// Tries the static table first and falls back to another resolver.
pub struct OverlayResolver<F: HostResolver> {
    overrides: StaticResolver,
    fallback: F,
}

impl<F: HostResolver> OverlayResolver<F> {
    pub fn new(overrides: StaticResolver, fallback: F) -> Self {
        Self {
            overrides,
            fallback,
        }
    }
}

#[async_trait]
impl<F: HostResolver> HostResolver for OverlayResolver<F> {
    async fn resolve(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        match self.overrides.resolve(host).await {
            Err(ResolveError::NotFound(_)) => self.fallback.resolve(host).await,
            answer => answer,
        }
    }
}
