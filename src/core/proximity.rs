//! Proximity search over gardens.
//!
//! Two passes: a bounding box lets the store use plain range indexes, then the
//! Haversine distance decides membership. The box is only ever a superset, so
//! the exact pass is the sole source of truth for "within R km".

use crate::core::geo::{bounding_box, haversine_km};
use crate::domain::model::{
    BoundingBox, Garden, NearbyGarden, ProximityQuery, ProximityResult, SearchStatus,
};
use crate::domain::ports::GardenStore;
use crate::utils::error::{GardenError, Result};
use crate::utils::validation::Validate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub fn validate_query(query: &ProximityQuery) -> Result<()> {
    if !(-90.0..=90.0).contains(&query.latitude) {
        return Err(GardenError::invalid_argument(
            "latitude",
            format!("{} is outside [-90, 90]", query.latitude),
        ));
    }
    if !(-180.0..=180.0).contains(&query.longitude) {
        return Err(GardenError::invalid_argument(
            "longitude",
            format!("{} is outside [-180, 180]", query.longitude),
        ));
    }
    if !(query.radius_km.is_finite() && query.radius_km > 0.0) {
        return Err(GardenError::invalid_argument(
            "radius_km",
            format!("{} must be a positive number", query.radius_km),
        ));
    }
    if query.limit == 0 {
        return Err(GardenError::invalid_argument("limit", "must be at least 1"));
    }
    Ok(())
}

impl Validate for ProximityQuery {
    fn validate(&self) -> Result<()> {
        validate_query(self)
    }
}

pub struct GeoProximityEngine<S: GardenStore> {
    store: S,
    store_timeout: Option<Duration>,
    store_failures: AtomicU64,
}

impl<S: GardenStore> GeoProximityEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            store_timeout: None,
            store_failures: AtomicU64::new(0),
        }
    }

    /// Bounds each store call; an elapsed call is reported as `StoreUnavailable`.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of searches that degraded to an empty result since construction.
    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    pub async fn find_nearby(&self, query: ProximityQuery) -> Result<ProximityResult> {
        query.validate()?;

        let bbox = bounding_box(query.latitude, query.longitude, query.radius_km);
        tracing::debug!(
            min_lat = bbox.min_lat,
            max_lat = bbox.max_lat,
            min_lon = bbox.min_lon,
            max_lon = bbox.max_lon,
            wraps = bbox.wraps_antimeridian(),
            "proximity pre-filter"
        );

        let candidates = match self.fetch_candidates(&query, &bbox).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.store_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    latitude = query.latitude,
                    longitude = query.longitude,
                    radius_km = query.radius_km,
                    limit = query.limit,
                    error = %e,
                    "garden store unavailable, returning empty proximity result"
                );
                return Ok(ProximityResult::degraded());
            }
        };

        let candidate_count = candidates.len();
        let gardens = rank_by_distance(candidates, &query);
        tracing::debug!(
            "proximity search kept {} of {} candidates",
            gardens.len(),
            candidate_count
        );

        Ok(ProximityResult {
            gardens,
            status: SearchStatus::Complete,
        })
    }

    async fn fetch_candidates(&self, query: &ProximityQuery, bbox: &BoundingBox) -> Result<Vec<Garden>> {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, self.lookup(query, bbox))
                .await
                .unwrap_or_else(|_| {
                    Err(GardenError::StoreUnavailable {
                        message: format!("store did not answer within {:?}", limit),
                    })
                }),
            None => self.lookup(query, bbox).await,
        }
    }

    // Native spatial predicate when the store has one, bounding box otherwise.
    async fn lookup(&self, query: &ProximityQuery, bbox: &BoundingBox) -> Result<Vec<Garden>> {
        match self.store.find_within(query, bbox).await? {
            Some(native) => Ok(native),
            None => self.store.gardens_in_box(bbox).await,
        }
    }
}

/// Exact filter, ascending sort and truncation.
pub fn rank_by_distance(candidates: Vec<Garden>, query: &ProximityQuery) -> Vec<NearbyGarden> {
    let mut ranked: Vec<NearbyGarden> = candidates
        .into_iter()
        .filter_map(|garden| {
            let distance_km = haversine_km(
                query.latitude,
                query.longitude,
                garden.latitude,
                garden.longitude,
            );
            (distance_km <= query.radius_km).then_some(NearbyGarden { garden, distance_km })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.garden.id.cmp(&b.garden.id))
    });
    ranked.truncate(query.limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryGardenStore;

    fn garden(id: &str, latitude: f64, longitude: f64) -> Garden {
        Garden {
            id: id.to_string(),
            name: id.to_string(),
            latitude,
            longitude,
            user_id: "u1".to_string(),
            description: None,
            created_at: None,
        }
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let valid = ProximityQuery::new(10.0, 10.0);
        assert!(validate_query(&valid).is_ok());

        let bad = [
            ProximityQuery::new(90.5, 0.0),
            ProximityQuery::new(-91.0, 0.0),
            ProximityQuery::new(0.0, 180.01),
            ProximityQuery::new(f64::NAN, 0.0),
            ProximityQuery::new(0.0, 0.0).with_radius_km(0.0),
            ProximityQuery::new(0.0, 0.0).with_radius_km(-5.0),
            ProximityQuery::new(0.0, 0.0).with_radius_km(f64::INFINITY),
            ProximityQuery::new(0.0, 0.0).with_limit(0),
        ];
        for query in bad {
            assert!(
                matches!(validate_query(&query), Err(GardenError::InvalidArgument { .. })),
                "{:?}",
                query
            );
        }
    }

    #[test]
    fn test_rank_sorts_filters_and_truncates() {
        let query = ProximityQuery::new(0.0, 0.0).with_radius_km(200.0).with_limit(2);
        let ranked = rank_by_distance(
            vec![
                garden("far", 1.5, 0.0),
                garden("outside", 3.0, 0.0),
                garden("near", 0.5, 0.0),
                garden("center", 0.0, 0.0),
            ],
            &query,
        );

        let ids: Vec<&str> = ranked.iter().map(|n| n.garden.id.as_str()).collect();
        assert_eq!(ids, vec!["center", "near"]);
        assert_eq!(ranked[0].distance_km, 0.0);
    }

    #[test]
    fn test_rank_breaks_ties_by_id() {
        let query = ProximityQuery::new(0.0, 0.0);
        let ranked = rank_by_distance(
            vec![garden("b", 0.01, 0.0), garden("a", -0.01, 0.0)],
            &query,
        );
        let ids: Vec<&str> = ranked.iter().map(|n| n.garden.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected_before_store() {
        let engine = GeoProximityEngine::new(InMemoryGardenStore::default());
        let result = engine.find_nearby(ProximityQuery::new(120.0, 0.0)).await;
        assert!(matches!(result, Err(GardenError::InvalidArgument { ref field, .. }) if field == "latitude"));
        assert_eq!(engine.store_failures(), 0);
    }

    #[tokio::test]
    async fn test_pole_query_returns_gardens() {
        let store = InMemoryGardenStore::new(vec![
            garden("same-meridian", 89.1, 10.0),
            garden("twenty-degrees-east", 89.2, 30.0),
            garden("opposite-meridian", 89.2, -170.0),
        ]);
        let engine = GeoProximityEngine::new(store);

        let result = engine
            .find_nearby(ProximityQuery::new(89.0, 10.0).with_radius_km(50.0))
            .await
            .unwrap();

        assert_eq!(result.status, SearchStatus::Complete);
        assert_eq!(result.garden_ids(), vec!["same-meridian", "twenty-degrees-east"]);
    }

    #[tokio::test]
    async fn test_query_across_the_pole() {
        let store = InMemoryGardenStore::new(vec![garden("other-side", 89.85, -170.0)]);
        let engine = GeoProximityEngine::new(store);

        let result = engine
            .find_nearby(ProximityQuery::new(89.8, 10.0).with_radius_km(50.0))
            .await
            .unwrap();

        assert_eq!(result.garden_ids(), vec!["other-side"]);
        assert!(result.gardens[0].distance_km < 40.0);
    }

    #[tokio::test]
    async fn test_antimeridian_query_includes_other_side() {
        let store = InMemoryGardenStore::new(vec![
            garden("west-of-line", 0.0, -179.95),
            garden("greenwich", 0.0, 0.0),
        ]);
        let engine = GeoProximityEngine::new(store);

        let result = engine
            .find_nearby(ProximityQuery::new(0.0, 179.9).with_radius_km(50.0))
            .await
            .unwrap();

        assert_eq!(result.garden_ids(), vec!["west-of-line"]);
        assert!(result.gardens[0].distance_km < 20.0);
    }
}
