use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub const DEFAULT_RADIUS_KM: f64 = 10.0;
pub const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garden {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub user_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Garden {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Great-circle distance in kilometers to the given point.
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        crate::core::geo::haversine_km(self.latitude, self.longitude, latitude, longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub limit: usize,
}

impl ProximityQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km: DEFAULT_RADIUS_KM,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyGarden {
    pub garden: Garden,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Complete,
    /// The store could not be reached; the result set is empty rather than partial.
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityResult {
    pub gardens: Vec<NearbyGarden>,
    pub status: SearchStatus,
}

impl ProximityResult {
    pub fn degraded() -> Self {
        Self {
            gardens: Vec::new(),
            status: SearchStatus::StoreUnavailable,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == SearchStatus::StoreUnavailable
    }

    pub fn garden_ids(&self) -> Vec<&str> {
        self.gardens.iter().map(|n| n.garden.id.as_str()).collect()
    }
}

/// Axis-aligned pre-filter window. Longitudes may fall outside [-180, 180]
/// when the window crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn wraps_antimeridian(&self) -> bool {
        self.min_lon < -180.0 || self.max_lon > 180.0
    }

    /// Closed longitude intervals inside [-180, 180] that the box covers.
    pub fn longitude_intervals(&self) -> Vec<(f64, f64)> {
        if self.min_lon <= -180.0 && self.max_lon >= 180.0 {
            return vec![(-180.0, 180.0)];
        }
        if self.min_lon < -180.0 {
            vec![(self.min_lon + 360.0, 180.0), (-180.0, self.max_lon)]
        } else if self.max_lon > 180.0 {
            vec![(self.min_lon, 180.0), (-180.0, self.max_lon - 360.0)]
        } else {
            vec![(self.min_lon, self.max_lon)]
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if latitude < self.min_lat || latitude > self.max_lat {
            return false;
        }
        self.longitude_intervals()
            .iter()
            .any(|&(lo, hi)| longitude >= lo && longitude <= hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressClassification {
    Public,
    Loopback,
    LinkLocal,
    Private,
    Unspecified,
    Unparseable,
    /// IPv6 address refused by the deny-all IPv6 policy.
    Ipv6Unclassified,
}

impl AddressClassification {
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Loopback => "loopback",
            Self::LinkLocal => "link-local",
            Self::Private => "private",
            Self::Unspecified => "unspecified",
            Self::Unparseable => "unparseable",
            Self::Ipv6Unclassified => "ipv6-unclassified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafeReason {
    Unparseable,
    Scheme(String),
    MissingHost,
    Resolution(String),
    Address {
        ip: IpAddr,
        class: AddressClassification,
    },
}

impl std::fmt::Display for UnsafeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable => write!(f, "URL could not be parsed"),
            Self::Scheme(scheme) => write!(f, "scheme `{}` is not allowed", scheme),
            Self::MissingHost => write!(f, "URL has no host"),
            Self::Resolution(cause) => write!(f, "host could not be resolved: {}", cause),
            Self::Address { ip, class } => write!(f, "{} resolves to a {} address", ip, class.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlVerdict {
    Safe {
        url: url::Url,
        /// Addresses that passed classification. A fetch must connect to one of these.
        addresses: Vec<IpAddr>,
    },
    Unsafe(UnsafeReason),
}

impl UrlVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub source: IpAddr,
}
