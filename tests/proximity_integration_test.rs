use async_trait::async_trait;
use homegarden_core::adapters::memory::InMemoryGardenStore;
use homegarden_core::core::geo::haversine_km;
use homegarden_core::core::{BoundingBox, GardenStore};
use homegarden_core::{Garden, GardenError, GeoProximityEngine, ProximityQuery, SearchStatus};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

const PARIS: (f64, f64) = (48.8566, 2.3522);

fn garden(id: &str, latitude: f64, longitude: f64) -> Garden {
    Garden {
        id: id.to_string(),
        name: format!("{} Garden", id),
        latitude,
        longitude,
        user_id: "geo-tester".to_string(),
        description: None,
        created_at: None,
    }
}

fn european_gardens() -> InMemoryGardenStore {
    InMemoryGardenStore::new(vec![
        garden("paris", 48.8566, 2.3522),
        garden("versailles", 48.8049, 2.1204),
        garden("london", 51.5074, -0.1278),
    ])
}

/// Store with a native spatial predicate that is deliberately sloppy.
struct SpatialIndexStore {
    returned: Vec<Garden>,
}

#[async_trait]
impl GardenStore for SpatialIndexStore {
    async fn gardens_in_box(&self, _bbox: &BoundingBox) -> homegarden_core::Result<Vec<Garden>> {
        panic!("box query must not be used when the native predicate answers");
    }

    async fn find_within(
        &self,
        _query: &ProximityQuery,
        _bbox: &BoundingBox,
    ) -> homegarden_core::Result<Option<Vec<Garden>>> {
        Ok(Some(self.returned.clone()))
    }
}

struct UnreachableStore;

#[async_trait]
impl GardenStore for UnreachableStore {
    async fn gardens_in_box(&self, _bbox: &BoundingBox) -> homegarden_core::Result<Vec<Garden>> {
        Err(GardenError::StoreUnavailable {
            message: "connection refused (os error 111)".to_string(),
        })
    }
}

struct SlowStore;

#[async_trait]
impl GardenStore for SlowStore {
    async fn gardens_in_box(&self, _bbox: &BoundingBox) -> homegarden_core::Result<Vec<Garden>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![garden("late", 0.0, 0.0)])
    }
}

#[tokio::test]
async fn test_default_radius_finds_only_paris() {
    let engine = GeoProximityEngine::new(european_gardens());
    let result = engine
        .find_nearby(ProximityQuery::new(PARIS.0, PARIS.1))
        .await
        .unwrap();

    assert_eq!(result.status, SearchStatus::Complete);
    assert_eq!(result.garden_ids(), vec!["paris"]);
    assert_eq!(result.gardens[0].distance_km, 0.0);
}

#[tokio::test]
async fn test_wider_radius_orders_by_distance() {
    let engine = GeoProximityEngine::new(european_gardens());

    let regional = engine
        .find_nearby(ProximityQuery::new(PARIS.0, PARIS.1).with_radius_km(20.0))
        .await
        .unwrap();
    assert_eq!(regional.garden_ids(), vec!["paris", "versailles"]);

    let continental = engine
        .find_nearby(ProximityQuery::new(PARIS.0, PARIS.1).with_radius_km(400.0))
        .await
        .unwrap();
    assert_eq!(continental.garden_ids(), vec!["paris", "versailles", "london"]);
    let london = &continental.gardens[2];
    assert!(london.distance_km > 340.0 && london.distance_km < 350.0);
}

#[tokio::test]
async fn test_limit_truncates_after_sorting() {
    let engine = GeoProximityEngine::new(european_gardens());
    let result = engine
        .find_nearby(
            ProximityQuery::new(51.5, -0.12)
                .with_radius_km(1000.0)
                .with_limit(1),
        )
        .await
        .unwrap();

    assert_eq!(result.garden_ids(), vec!["london"]);
}

#[tokio::test]
async fn test_native_results_are_rechecked() {
    let store = SpatialIndexStore {
        returned: vec![
            garden("london", 51.5074, -0.1278),
            garden("versailles", 48.8049, 2.1204),
            garden("paris", 48.8566, 2.3522),
        ],
    };
    let engine = GeoProximityEngine::new(store);

    let result = engine
        .find_nearby(ProximityQuery::new(PARIS.0, PARIS.1).with_radius_km(20.0))
        .await
        .unwrap();

    assert_eq!(result.garden_ids(), vec!["paris", "versailles"]);
}

#[tokio::test]
async fn test_store_failure_degrades_to_empty_and_is_counted() {
    let engine = GeoProximityEngine::new(UnreachableStore);

    for _ in 0..2 {
        let result = engine
            .find_nearby(ProximityQuery::new(PARIS.0, PARIS.1))
            .await
            .expect("store failure must not propagate");
        assert!(result.is_degraded());
        assert!(result.gardens.is_empty());
    }
    assert_eq!(engine.store_failures(), 2);
}

#[tokio::test]
async fn test_invalid_query_is_not_a_store_failure() {
    let engine = GeoProximityEngine::new(UnreachableStore);
    let result = engine
        .find_nearby(ProximityQuery::new(0.0, 200.0))
        .await;

    assert!(matches!(result, Err(GardenError::InvalidArgument { .. })));
    assert_eq!(engine.store_failures(), 0);
}

#[tokio::test]
async fn test_store_timeout_is_store_unavailable() {
    let engine = GeoProximityEngine::new(SlowStore).with_store_timeout(Duration::from_millis(100));
    let result = engine
        .find_nearby(ProximityQuery::new(0.0, 0.0))
        .await
        .unwrap();

    assert_eq!(result.status, SearchStatus::StoreUnavailable);
    assert_eq!(engine.store_failures(), 1);
}

#[tokio::test]
async fn test_pole_query_does_not_come_back_empty() {
    let engine = GeoProximityEngine::new(InMemoryGardenStore::new(vec![
        garden("arctic", 89.2, 30.0),
    ]));
    let result = engine
        .find_nearby(ProximityQuery::new(89.0, 10.0).with_radius_km(50.0))
        .await
        .unwrap();

    assert_eq!(result.garden_ids(), vec!["arctic"]);
}

#[tokio::test]
async fn test_antimeridian_both_directions() {
    let engine = GeoProximityEngine::new(InMemoryGardenStore::new(vec![
        garden("east", 0.0, 179.95),
        garden("west", 0.0, -179.95),
    ]));

    let from_east = engine
        .find_nearby(ProximityQuery::new(0.0, 179.9).with_radius_km(50.0))
        .await
        .unwrap();
    assert_eq!(from_east.garden_ids(), vec!["east", "west"]);

    let from_west = engine
        .find_nearby(ProximityQuery::new(0.0, -179.9).with_radius_km(50.0))
        .await
        .unwrap();
    assert_eq!(from_west.garden_ids(), vec!["west", "east"]);
}

fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    wrapped.clamp(-180.0, 180.0)
}

fn scattered_gardens(center: (f64, f64), offsets: &[(f64, f64)]) -> Vec<Garden> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, (dlat, dlon))| {
            let lat = (center.0 + dlat).clamp(-90.0, 90.0);
            let lon = wrap_longitude(center.1 + dlon);
            garden(&format!("g{:03}", i), lat, lon)
        })
        .collect()
}

fn ids_within(
    engine: &GeoProximityEngine<InMemoryGardenStore>,
    center: (f64, f64),
    radius_km: f64,
) -> BTreeSet<String> {
    let query = ProximityQuery::new(center.0, center.1)
        .with_radius_km(radius_km)
        .with_limit(10_000);
    tokio_test::block_on(engine.find_nearby(query))
        .unwrap()
        .gardens
        .into_iter()
        .map(|n| n.garden.id)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_radius_is_monotonic(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        r1 in 1.0f64..800.0,
        extra in 0.0f64..800.0,
        offsets in prop::collection::vec((-10.0f64..10.0, -40.0f64..40.0), 1..60),
    ) {
        let gardens = scattered_gardens((lat, lon), &offsets);
        let engine = GeoProximityEngine::new(InMemoryGardenStore::new(gardens));

        let narrow = ids_within(&engine, (lat, lon), r1);
        let wide = ids_within(&engine, (lat, lon), r1 + extra);
        prop_assert!(narrow.is_subset(&wide));
    }

    #[test]
    fn prop_matches_brute_force(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        radius in 0.5f64..2000.0,
        offsets in prop::collection::vec((-20.0f64..20.0, -60.0f64..60.0), 1..60),
    ) {
        let gardens = scattered_gardens((lat, lon), &offsets);
        let expected: BTreeSet<String> = gardens
            .iter()
            .filter(|g| haversine_km(lat, lon, g.latitude, g.longitude) <= radius)
            .map(|g| g.id.clone())
            .collect();

        let engine = GeoProximityEngine::new(InMemoryGardenStore::new(gardens.clone()));
        let query = ProximityQuery::new(lat, lon).with_radius_km(radius).with_limit(10_000);
        let result = tokio_test::block_on(engine.find_nearby(query)).unwrap();

        for nearby in &result.gardens {
            prop_assert!(nearby.distance_km <= radius);
        }
        for pair in result.gardens.windows(2) {
            prop_assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        let found: BTreeSet<String> = result.gardens.into_iter().map(|n| n.garden.id).collect();
        prop_assert_eq!(found, expected);
    }
}
