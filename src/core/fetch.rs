//! Image-by-URL fetching behind the SSRF guard.
//!
//! The guard runs immediately before each fetch and the address it approved
//! is pinned into the HTTP client, so the connection cannot be re-resolved to
//! a different (possibly private) address between check and use.

use crate::core::url_guard::OutboundUrlGuard;
use crate::domain::model::{FetchedImage, UnsafeReason, UrlVerdict};
use crate::utils::error::{GardenError, Result};
use crate::utils::logger::SECURITY_TARGET;
use crate::utils::throttle::LogThrottle;
use reqwest::{redirect, Client};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = "HomeGarden-API/2.0 (Security-Scan; +https://homegarden.app)";
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_bytes: DEFAULT_MAX_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Address a fetch connects to: the first approved IPv4 answer, else the first answer.
pub fn pinned_address(addresses: &[IpAddr]) -> Option<IpAddr> {
    addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.first())
        .copied()
}

#[derive(Debug)]
pub struct GuardedFetcher {
    guard: OutboundUrlGuard,
    settings: FetchSettings,
    refusals: LogThrottle,
}

impl GuardedFetcher {
    pub fn new(guard: OutboundUrlGuard, settings: FetchSettings) -> Self {
        Self {
            guard,
            settings,
            refusals: LogThrottle::default(),
        }
    }

    pub fn with_refusal_throttle(mut self, throttle: LogThrottle) -> Self {
        self.refusals = throttle;
        self
    }

    pub fn guard(&self) -> &OutboundUrlGuard {
        &self.guard
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let (approved, addresses) = match self.guard.check(url).await {
            UrlVerdict::Safe { url, addresses } => (url, addresses),
            UrlVerdict::Unsafe(reason) => {
                self.report_refusal(url, &reason);
                return Err(GardenError::UnsafeUrl {
                    url: url.to_string(),
                    reason: reason.to_string(),
                });
            }
        };

        let address = pinned_address(&addresses).ok_or_else(|| GardenError::UnsafeUrl {
            url: url.to_string(),
            reason: "no approved address".to_string(),
        })?;

        self.fetch_pinned(&approved, address).await
    }

    fn report_refusal(&self, url: &str, reason: &UnsafeReason) {
        if let Some(suppressed) = self.refusals.admit() {
            tracing::warn!(
                target: SECURITY_TARGET,
                url,
                reason = %reason,
                suppressed,
                "refused outbound fetch"
            );
        }
    }

    /// Connects to `address` only. The caller must have approved it with the guard.
    async fn fetch_pinned(&self, url: &Url, address: IpAddr) -> Result<FetchedImage> {
        let port = url.port_or_known_default().unwrap_or(80);

        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .timeout(self.settings.timeout)
            .user_agent(self.settings.user_agent.as_str());
        if let Some(domain) = url.domain() {
            builder = builder.resolve(domain, SocketAddr::new(address, port));
        }
        let client = builder.build()?;

        tracing::debug!("Fetching {} via pinned address {}", url, address);
        let mut response = client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GardenError::FetchFailed {
                message: format!("{} answered {}", url, status),
            });
        }

        if response
            .content_length()
            .is_some_and(|declared| declared > self.settings.max_bytes)
        {
            return Err(GardenError::PayloadTooLarge {
                limit: self.settings.max_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (bytes.len() + chunk.len()) as u64 > self.settings.max_bytes {
                return Err(GardenError::PayloadTooLarge {
                    limit: self.settings.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedImage {
            bytes,
            content_type,
            source: address,
        })
    }
}
