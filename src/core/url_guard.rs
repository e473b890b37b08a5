//! Outbound URL gate against server-side request forgery.
//!
//! A client-supplied URL is fetchable only when its scheme is http(s) and
//! every address its host resolves to is public. Any failure along the way
//! means "unsafe".

use crate::domain::model::{AddressClassification, UnsafeReason, UrlVerdict};
use crate::domain::ports::HostResolver;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::{Host, Url};

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Closed integer ranges of refused IPv4 blocks.
const BLOCKED_IPV4_RANGES: [(u32, u32, AddressClassification); 5] = [
    (0x0a00_0000, 0x0aff_ffff, AddressClassification::Private), // 10.0.0.0/8
    (0xac10_0000, 0xac1f_ffff, AddressClassification::Private), // 172.16.0.0/12
    (0xc0a8_0000, 0xc0a8_ffff, AddressClassification::Private), // 192.168.0.0/16
    (0x7f00_0000, 0x7fff_ffff, AddressClassification::Loopback), // 127.0.0.0/8
    (0xa9fe_0000, 0xa9fe_ffff, AddressClassification::LinkLocal), // 169.254.0.0/16
];

/// How IPv6 addresses other than `::1`, `::` and IPv4-mapped ones are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ipv6Policy {
    /// Judge resolved hosts by their IPv4 answers only; IPv6 literals are
    /// refused unless they are IPv4-mapped public addresses.
    #[default]
    DenyAll,
    /// Keep IPv6 answers. Refuse fc00::/7, fec0::/10, fe80::/10 and multicast,
    /// and judge NAT64 and 6to4 addresses by the IPv4 address they embed.
    Classify,
}

pub fn ipv4_to_u32(octets: [u8; 4]) -> u32 {
    (u32::from(octets[0]) << 24)
        | (u32::from(octets[1]) << 16)
        | (u32::from(octets[2]) << 8)
        | u32::from(octets[3])
}

/// Parses strict dotted-quad notation: four decimal octets, each 0-255.
pub fn parse_dotted_quad(address: &str) -> Option<u32> {
    let mut octets = [0u8; 4];
    let mut parts = address.split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse::<u8>().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }
    Some(ipv4_to_u32(octets))
}

fn classify_ipv4_bits(bits: u32) -> AddressClassification {
    if bits == 0 {
        return AddressClassification::Unspecified;
    }
    BLOCKED_IPV4_RANGES
        .iter()
        .find(|(start, end, _)| bits >= *start && bits <= *end)
        .map(|(_, _, class)| *class)
        .unwrap_or(AddressClassification::Public)
}

pub fn classify_ipv4(address: Ipv4Addr) -> AddressClassification {
    classify_ipv4_bits(ipv4_to_u32(address.octets()))
}

/// IPv4 address carried by NAT64 (64:ff9b::/96) and 6to4 (2002::/16) addresses.
fn embedded_ipv4(address: Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = address.segments();
    let octets = address.octets();
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        return Some(Ipv4Addr::new(octets[12], octets[13], octets[14], octets[15]));
    }
    if segments[0] == 0x2002 {
        return Some(Ipv4Addr::new(octets[2], octets[3], octets[4], octets[5]));
    }
    None
}

pub fn classify_ipv6(address: Ipv6Addr, policy: Ipv6Policy) -> AddressClassification {
    if address.is_loopback() {
        return AddressClassification::Loopback;
    }
    if address.is_unspecified() {
        return AddressClassification::Unspecified;
    }
    if let Some(mapped) = address.to_ipv4_mapped() {
        return classify_ipv4(mapped);
    }

    match policy {
        Ipv6Policy::DenyAll => AddressClassification::Ipv6Unclassified,
        Ipv6Policy::Classify => {
            if let Some(embedded) = embedded_ipv4(address) {
                return classify_ipv4(embedded);
            }
            let first = address.segments()[0];
            if first & 0xfe00 == 0xfc00 || first & 0xffc0 == 0xfec0 {
                AddressClassification::Private
            } else if first & 0xffc0 == 0xfe80 {
                AddressClassification::LinkLocal
            } else if address.is_multicast() {
                AddressClassification::Ipv6Unclassified
            } else {
                AddressClassification::Public
            }
        }
    }
}

pub fn classify(address: IpAddr, policy: Ipv6Policy) -> AddressClassification {
    match address {
        IpAddr::V4(v4) => classify_ipv4(v4),
        IpAddr::V6(v6) => classify_ipv6(v6, policy),
    }
}

/// Classifies a textual address as returned by an external resolver.
pub fn classify_str(address: &str, policy: Ipv6Policy) -> AddressClassification {
    if let Some(bits) = parse_dotted_quad(address) {
        return classify_ipv4_bits(bits);
    }
    match address.parse::<Ipv6Addr>() {
        Ok(v6) => classify_ipv6(v6, policy),
        Err(_) => AddressClassification::Unparseable,
    }
}

/// Stateless SSRF gate. Call it immediately before every fetch; verdicts
/// must not be cached because DNS answers change.
#[derive(Clone)]
pub struct OutboundUrlGuard {
    resolver: Arc<dyn HostResolver>,
    ipv6_policy: Ipv6Policy,
}

impl OutboundUrlGuard {
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            resolver,
            ipv6_policy: Ipv6Policy::default(),
        }
    }

    pub fn with_ipv6_policy(mut self, policy: Ipv6Policy) -> Self {
        self.ipv6_policy = policy;
        self
    }

    pub fn ipv6_policy(&self) -> Ipv6Policy {
        self.ipv6_policy
    }

    pub async fn is_safe(&self, url: &str) -> bool {
        self.check(url).await.is_safe()
    }

    pub async fn check(&self, url: &str) -> UrlVerdict {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return UrlVerdict::Unsafe(UnsafeReason::Unparseable),
        };

        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return UrlVerdict::Unsafe(UnsafeReason::Scheme(parsed.scheme().to_string()));
        }

        let addresses = match parsed.host() {
            None => return UrlVerdict::Unsafe(UnsafeReason::MissingHost),
            Some(Host::Ipv4(v4)) => vec![IpAddr::V4(v4)],
            Some(Host::Ipv6(v6)) => vec![IpAddr::V6(v6)],
            Some(Host::Domain(domain)) => match self.resolver.resolve(domain).await {
                Ok(answers) => {
                    let addresses = self.usable_answers(answers);
                    if addresses.is_empty() {
                        return UrlVerdict::Unsafe(UnsafeReason::Resolution(format!(
                            "no usable addresses for {}",
                            domain
                        )));
                    }
                    addresses
                }
                Err(e) => {
                    tracing::debug!(host = domain, error = %e, "resolution failed during URL check");
                    return UrlVerdict::Unsafe(UnsafeReason::Resolution(e.to_string()));
                }
            },
        };

        for ip in &addresses {
            let class = classify(*ip, self.ipv6_policy);
            if !class.is_public() {
                return UrlVerdict::Unsafe(UnsafeReason::Address { ip: *ip, class });
            }
        }

        UrlVerdict::Safe {
            url: parsed,
            addresses,
        }
    }
}

impl OutboundUrlGuard {
    /// Resolver answers the guard will vouch for. Under `DenyAll` only IPv4
    /// answers (including IPv4-mapped ones) are kept, so a dual-stack host is
    /// judged and later connected to by its A records alone.
    fn usable_answers(&self, answers: Vec<IpAddr>) -> Vec<IpAddr> {
        match self.ipv6_policy {
            Ipv6Policy::Classify => answers,
            Ipv6Policy::DenyAll => answers
                .into_iter()
                .filter(|ip| match ip {
                    IpAddr::V4(_) => true,
                    IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some(),
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for OutboundUrlGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundUrlGuard")
            .field("ipv6_policy", &self.ipv6_policy)
            .finish_non_exhaustive()
    }
}
