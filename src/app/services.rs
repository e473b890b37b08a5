use crate::adapters::dns::{OverlayResolver, StaticResolver, SystemResolver};
use crate::adapters::memory::InMemoryGardenStore;
use crate::config::TomlConfig;
use crate::core::fetch::GuardedFetcher;
use crate::core::proximity::GeoProximityEngine;
use crate::core::url_guard::OutboundUrlGuard;
use crate::domain::ports::HostResolver;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;

/// Explicitly wired collaborators for one process. Nothing here is global;
/// request handlers receive these by reference.
pub struct GardenServices {
    pub config: TomlConfig,
    pub proximity: GeoProximityEngine<InMemoryGardenStore>,
    pub fetcher: GuardedFetcher,
}

impl GardenServices {
    pub fn from_config(config: TomlConfig) -> Result<Self> {
        config.validate()?;

        let store = InMemoryGardenStore::from_file(config.gardens_file())?;
        tracing::info!("🌱 Loaded {} gardens from {}", store.len(), config.gardens_file());

        let mut proximity = GeoProximityEngine::new(store);
        if let Some(timeout) = config.store_timeout() {
            proximity = proximity.with_store_timeout(timeout);
        }

        let guard = OutboundUrlGuard::new(build_resolver(&config)?).with_ipv6_policy(config.ipv6_policy());
        let fetcher = GuardedFetcher::new(guard, config.fetch_settings());

        Ok(Self {
            config,
            proximity,
            fetcher,
        })
    }

    pub fn guard(&self) -> &OutboundUrlGuard {
        self.fetcher.guard()
    }
}

/// OS resolver, with configured static overrides layered on top when present.
pub fn build_resolver(config: &TomlConfig) -> Result<Arc<dyn HostResolver>> {
    let overrides = StaticResolver::from_table(&config.resolver_hosts())?;
    if overrides.is_empty() {
        return Ok(Arc::new(SystemResolver::new()));
    }

    tracing::info!("Using {} static resolver overrides", overrides.len());
    Ok(Arc::new(OverlayResolver::new(overrides, SystemResolver::new())))
}
