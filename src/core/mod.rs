pub mod fetch;
pub mod geo;
pub mod proximity;
pub mod url_guard;

pub use crate::domain::model::{
    AddressClassification, BoundingBox, FetchedImage, Garden, NearbyGarden, ProximityQuery,
    ProximityResult, SearchStatus, UnsafeReason, UrlVerdict,
};
pub use crate::domain::ports::{GardenStore, HostResolver, ResolveError};
pub use crate::utils::error::Result;
