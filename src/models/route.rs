use crate::error::{ProviderError, ProviderErrorKind};
use crate::models::{Coordinates, Place};
use serde::{Deserialize, Serialize};

/// Ordered `[longitude, latitude]` pairs.
pub type RouteGeometry = Vec<[f64; 2]>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub northeast: Coordinates,
    pub southwest: Coordinates,
}

/// Why a route was synthesized locally instead of coming from the router.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ProviderTimeout,
    ProviderUnavailable,
    ProviderRejected,
    NoRouteFound,
    MalformedResponse,
    ProviderNotConfigured,
}

impl FallbackReason {
    pub fn from_error(error: &ProviderError) -> Self {
        match error.kind() {
            ProviderErrorKind::Timeout => FallbackReason::ProviderTimeout,
            ProviderErrorKind::Network => FallbackReason::ProviderUnavailable,
            ProviderErrorKind::Status => FallbackReason::ProviderRejected,
            ProviderErrorKind::EmptyResponse => FallbackReason::NoRouteFound,
            ProviderErrorKind::Malformed => FallbackReason::MalformedResponse,
            ProviderErrorKind::NotConfigured => FallbackReason::ProviderNotConfigured,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub geometry: RouteGeometry,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    /// Waypoints in the order the route visits them.
    #[serde(default)]
    pub waypoints: Vec<Place>,
}

impl Route {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    pub fn duration_minutes(&self) -> u32 {
        (self.duration_seconds / 60.0).round() as u32
    }
}

/// Geometry as a routing provider hands it back. Each variant is normalized
/// into a [`RouteGeometry`] at the service boundary.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProviderGeometry {
    /// Encoded polyline, precision 5.
    Polyline(String),
    GeoJson(geojson::Geometry),
    Coordinates(Vec<[f64; 2]>),
}

/// A routing provider's answer before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub geometry: ProviderGeometry,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
    #[serde(default)]
    pub waypoints: Vec<Place>,
}

impl RouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        self.origin
            .validate()
            .map_err(|e| format!("origin: {}", e))?;
        self.destination
            .validate()
            .map_err(|e| format!("destination: {}", e))?;
        if !self.origin.is_usable() {
            return Err("origin coordinates are missing".to_string());
        }
        if !self.destination.is_usable() {
            return Err("destination coordinates are missing".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_reason_follows_error_kind() {
        assert_eq!(
            FallbackReason::from_error(&ProviderError::Timeout),
            FallbackReason::ProviderTimeout
        );
        assert_eq!(
            FallbackReason::from_error(&ProviderError::EmptyResponse),
            FallbackReason::NoRouteFound
        );
        assert_eq!(
            FallbackReason::from_error(&ProviderError::Network("refused".into())),
            FallbackReason::ProviderUnavailable
        );
    }

    #[test]
    fn provider_geometry_deserializes_each_shape() {
        let polyline: ProviderGeometry = serde_json::from_str(r#""_p~iF~ps|U""#).unwrap();
        assert!(matches!(polyline, ProviderGeometry::Polyline(_)));

        let geojson: ProviderGeometry = serde_json::from_str(
            r#"{"type":"LineString","coordinates":[[76.26,9.93],[77.05,10.08]]}"#,
        )
        .unwrap();
        assert!(matches!(geojson, ProviderGeometry::GeoJson(_)));

        let raw: ProviderGeometry = serde_json::from_str("[[76.26,9.93],[77.05,10.08]]").unwrap();
        assert_eq!(
            raw,
            ProviderGeometry::Coordinates(vec![[76.26, 9.93], [77.05, 10.08]])
        );
    }

    #[test]
    fn route_request_rejects_null_island_origin() {
        let request: RouteRequest = serde_json::from_value(serde_json::json!({
            "origin": {"latitude": 0.0, "longitude": 0.0},
            "destination": {"latitude": 10.0889, "longitude": 77.0595}
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn route_serializes_camel_case() {
        let route = Route {
            geometry: vec![[76.26, 9.93], [77.05, 10.08]],
            distance_meters: 1500.0,
            duration_seconds: 90.0,
            is_fallback: true,
            fallback_reason: Some(FallbackReason::ProviderTimeout),
            bounds: None,
            waypoints: vec![],
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["isFallback"], true);
        assert_eq!(json["fallbackReason"], "provider_timeout");
        assert_eq!(json["distanceMeters"], 1500.0);
        assert_eq!(route.duration_minutes(), 2);
    }
}
