//! Great-circle distance and bounding-box math.

use crate::domain::model::BoundingBox;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate length of one degree of latitude.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Above this absolute latitude the longitude window is widened to the full
/// circle instead of dividing by a vanishing cosine.
pub const POLAR_LATITUDE_THRESHOLD: f64 = 80.0;

pub fn to_radians(degrees: f64) -> f64 {
    degrees * (std::f64::consts::PI / 180.0)
}

pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = to_radians(lat2 - lat1);
    let d_lon = to_radians(lon2 - lon1);

    let a = (d_lat / 2.0).sin().powi(2)
        + to_radians(lat1).cos() * to_radians(lat2).cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push `a` a hair past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Pre-filter window around a center point.
///
/// Latitude bounds are clamped to [-90, 90]. Longitude bounds are left
/// unwrapped so callers can detect an antimeridian crossing; see
/// [`BoundingBox::longitude_intervals`].
pub fn bounding_box(latitude: f64, longitude: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / KM_PER_DEGREE;
    let min_lat = (latitude - lat_delta).max(-90.0);
    let max_lat = (latitude + lat_delta).min(90.0);

    // The circle is widest in longitude at the box edge farthest from the equator.
    let widest_lat = min_lat.abs().max(max_lat.abs());
    let lon_delta = if widest_lat > POLAR_LATITUDE_THRESHOLD {
        None
    } else {
        let delta = radius_km / (KM_PER_DEGREE * to_radians(widest_lat).cos());
        (delta.is_finite() && delta < 180.0).then_some(delta)
    };

    match lon_delta {
        Some(delta) => BoundingBox {
            min_lat,
            max_lat,
            min_lon: longitude - delta,
            max_lon: longitude + delta,
        },
        None => BoundingBox {
            min_lat,
            max_lat,
            min_lon: -180.0,
            max_lon: 180.0,
        },
    }
}
