//! Distance, polyline, bounds and grouping helpers shared by the suggestion
//! engine and route assembly. Everything here is pure.

mod bands;
mod polyline;

pub use bands::{bucket_by_distance, rebalance_bands, truncate_bands};
pub use polyline::decode_polyline;

use crate::constants::EARTH_RADIUS_METERS;
use crate::models::{BoundingBox, Coordinates};
use geo::{BoundingRect, LineString};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Great-circle distance in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Bounding box of `[longitude, latitude]` points; `None` when empty.
pub fn bounding_box(points: &[[f64; 2]]) -> Option<BoundingBox> {
    let line: LineString<f64> = points.iter().map(|p| (p[0], p[1])).collect();
    let rect = line.bounding_rect()?;

    Some(BoundingBox {
        northeast: Coordinates {
            latitude: rect.max().y,
            longitude: rect.max().x,
        },
        southwest: Coordinates {
            latitude: rect.min().y,
            longitude: rect.min().x,
        },
    })
}

/// Distance in meters from `point` to the segment `start`-`end`.
///
/// The projection is computed in lat/lng space and clamped to the segment,
/// then measured with haversine. Good enough for regional corridors.
pub fn point_to_segment_distance_m(
    point: &Coordinates,
    start: &Coordinates,
    end: &Coordinates,
) -> f64 {
    let dx = end.longitude - start.longitude;
    let dy = end.latitude - start.latitude;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        return point.distance_to(start);
    }

    let t = ((point.longitude - start.longitude) * dx + (point.latitude - start.latitude) * dy)
        / len_sq;
    let t = t.clamp(0.0, 1.0);

    let projected = Coordinates {
        latitude: start.latitude + t * dy,
        longitude: start.longitude + t * dx,
    };
    point.distance_to(&projected)
}

/// Sum of haversine distances between consecutive `[lng, lat]` points.
pub fn path_length_m(points: &[[f64; 2]]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_meters(w[0][1], w[0][0], w[1][1], w[1][0]))
        .sum()
}

/// Uniformly shuffled copy (Fisher-Yates).
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(&mut rand::rng());
    shuffled
}

/// Deterministic variant of [`shuffle`] for reproducible output.
pub fn shuffle_seeded<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    let mut shuffled = items.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);
    shuffled
}
