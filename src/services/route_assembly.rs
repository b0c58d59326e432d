use crate::constants::{
    FALLBACK_CURVE_FACTOR, FALLBACK_POINTS_PER_LEG, FALLBACK_SPEED_METERS_PER_SECOND,
};
use crate::error::ProviderError;
use crate::geometry::{bounding_box, decode_polyline, path_length_m};
use crate::models::{
    Coordinates, FallbackReason, Place, ProviderGeometry, Route, RouteGeometry,
};
use crate::services::routing::RoutingProvider;
use std::f64::consts::PI;
use std::sync::Arc;

/// Builds a drivable route through selected places, falling back to a
/// synthesized path whenever the routing provider cannot answer.
pub struct RouteAssembler {
    provider: Arc<dyn RoutingProvider>,
}

impl RouteAssembler {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        RouteAssembler { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Never fails: the returned geometry always has at least two points.
    pub async fn build_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: Vec<Place>,
    ) -> Route {
        let waypoints = order_waypoints(&origin, waypoints);

        let mut control = Vec::with_capacity(waypoints.len() + 2);
        control.push(origin);
        control.extend(waypoints.iter().map(|w| w.coordinates));
        control.push(destination);

        match self.route_through(&control).await {
            Ok((geometry, distance_meters, duration_seconds)) => {
                tracing::info!(
                    provider = self.provider.name(),
                    waypoints = waypoints.len(),
                    "Route: {:.1}km, {:.0}min, {} points",
                    distance_meters / 1000.0,
                    duration_seconds / 60.0,
                    geometry.len()
                );
                Route {
                    bounds: bounding_box(&geometry),
                    geometry,
                    distance_meters,
                    duration_seconds,
                    is_fallback: false,
                    fallback_reason: None,
                    waypoints,
                }
            }
            Err(e) => {
                let reason = FallbackReason::from_error(&e);
                tracing::warn!(
                    provider = self.provider.name(),
                    reason = ?reason,
                    "Routing failed, using fallback path: {}",
                    e
                );
                fallback_route(&control, waypoints, reason)
            }
        }
    }

    async fn route_through(
        &self,
        control: &[Coordinates],
    ) -> Result<(RouteGeometry, f64, f64), ProviderError> {
        let answer = self.provider.route(control).await?;
        let geometry = normalize_geometry(answer.geometry)?;

        // Some providers omit totals; measure the geometry instead.
        let distance_meters = if answer.distance_meters.is_finite() && answer.distance_meters > 0.0 {
            answer.distance_meters
        } else {
            path_length_m(&geometry)
        };
        let duration_seconds = if answer.duration_seconds.is_finite() && answer.duration_seconds > 0.0 {
            answer.duration_seconds
        } else {
            distance_meters / FALLBACK_SPEED_METERS_PER_SECOND
        };

        Ok((geometry, distance_meters, duration_seconds))
    }
}

/// Drop waypoints without usable coordinates and sort the rest by
/// straight-line distance from the origin. The sort is stable.
pub fn order_waypoints(origin: &Coordinates, waypoints: Vec<Place>) -> Vec<Place> {
    let mut usable: Vec<(f64, Place)> = waypoints
        .into_iter()
        .filter(|w| {
            let ok = w.coordinates.is_usable();
            if !ok {
                tracing::debug!("Skipping waypoint '{}' without coordinates", w.name);
            }
            ok
        })
        .map(|w| (origin.distance_to(&w.coordinates), w))
        .collect();

    usable.sort_by(|a, b| a.0.total_cmp(&b.0));
    usable.into_iter().map(|(_, w)| w).collect()
}

/// Convert provider geometry into `[lng, lat]` pairs.
/// Fewer than two points is treated as no route.
pub fn normalize_geometry(geometry: ProviderGeometry) -> Result<RouteGeometry, ProviderError> {
    let points: RouteGeometry = match geometry {
        ProviderGeometry::Polyline(encoded) => decode_polyline(&encoded),
        ProviderGeometry::Coordinates(points) => points,
        ProviderGeometry::GeoJson(geometry) => match geometry.value {
            geojson::Value::LineString(positions) => positions_to_pairs(&positions),
            geojson::Value::MultiLineString(lines) => {
                lines.iter().flat_map(|line| positions_to_pairs(line)).collect()
            }
            _ => {
                return Err(ProviderError::Malformed(
                    "route geometry is not a line".to_string(),
                ))
            }
        },
    };

    let points: RouteGeometry = points
        .into_iter()
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .collect();

    if points.len() < 2 {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(points)
}

fn positions_to_pairs(positions: &[Vec<f64>]) -> RouteGeometry {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| [p[0], p[1]])
        .collect()
}

/// Local path through the control points: a straight segment when there are
/// no waypoints, otherwise a gently curved leg between each pair.
pub fn fallback_geometry(control: &[Coordinates]) -> RouteGeometry {
    if control.len() <= 2 {
        return control.iter().map(Coordinates::to_lng_lat).collect();
    }

    let mut geometry = Vec::with_capacity((control.len() - 1) * FALLBACK_POINTS_PER_LEG + 1);
    for leg in control.windows(2) {
        let (from, to) = (&leg[0], &leg[1]);
        let dx = to.longitude - from.longitude;
        let dy = to.latitude - from.latitude;

        for i in 0..FALLBACK_POINTS_PER_LEG {
            let t = i as f64 / FALLBACK_POINTS_PER_LEG as f64;
            // Offset along the leg's normal, zero at both ends.
            let bend = FALLBACK_CURVE_FACTOR * (PI * t).sin();
            geometry.push([
                from.longitude + t * dx - dy * bend,
                from.latitude + t * dy + dx * bend,
            ]);
        }
    }
    if let Some(last) = control.last() {
        geometry.push(last.to_lng_lat());
    }
    geometry
}

fn fallback_route(control: &[Coordinates], waypoints: Vec<Place>, reason: FallbackReason) -> Route {
    let geometry = fallback_geometry(control);
    let legs: Vec<[f64; 2]> = control.iter().map(Coordinates::to_lng_lat).collect();
    let distance_meters = path_length_m(&legs);

    Route {
        bounds: bounding_box(&geometry),
        geometry,
        distance_meters,
        duration_seconds: distance_meters / FALLBACK_SPEED_METERS_PER_SECOND,
        is_fallback: true,
        fallback_reason: Some(reason),
        waypoints,
    }
}
