use crate::domain::model::{BoundingBox, Garden, ProximityQuery};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;
use thiserror::Error;

/// Read access to persisted gardens.
///
/// Every store answers bounding-box queries. Stores backed by a spatial index
/// may also answer the full query natively; the engine still re-checks every
/// returned garden against the exact distance.
#[async_trait]
pub trait GardenStore: Send + Sync {
    async fn gardens_in_box(&self, bbox: &BoundingBox) -> Result<Vec<Garden>>;

    /// `Ok(None)` means the store has no native spatial predicate.
    async fn find_within(
        &self,
        _query: &ProximityQuery,
        _bbox: &BoundingBox,
    ) -> Result<Option<Vec<Garden>>> {
        Ok(None)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("host not found: {0}")]
    NotFound(String),

    #[error("no addresses returned for {0}")]
    NoAddresses(String),

    #[error("resolver failure: {0}")]
    Failed(String),
}

/// Hostname to address resolution. Implementations must follow the same
/// policy the outbound HTTP client uses, otherwise the guard checks a
/// different answer than the one the fetch connects to.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError>;
}
