pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TomlConfig;

pub use app::GardenServices;
pub use core::fetch::{FetchSettings, GuardedFetcher};
pub use core::proximity::GeoProximityEngine;
pub use core::url_guard::{Ipv6Policy, OutboundUrlGuard};
pub use domain::model::{Garden, NearbyGarden, ProximityQuery, ProximityResult, SearchStatus};
pub use utils::error::{GardenError, Result};
