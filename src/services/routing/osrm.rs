use super::RoutingProvider;
use crate::error::{status_error, ProviderError};
use crate::models::{Coordinates, ProviderGeometry, ProviderRoute};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Geometry encoding requested from OSRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryFormat {
    #[default]
    GeoJson,
    Polyline,
}

impl GeometryFormat {
    fn as_param(&self) -> &'static str {
        match self {
            GeometryFormat::GeoJson => "geojson",
            GeometryFormat::Polyline => "polyline",
        }
    }
}

#[derive(Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
    geometry_format: GeometryFormat,
    timeout: Duration,
}

impl OsrmClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self::with_format(base_url, timeout, GeometryFormat::default())
    }

    pub fn with_format(base_url: String, timeout: Duration, geometry_format: GeometryFormat) -> Self {
        OsrmClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            geometry_format,
            timeout,
        }
    }

    fn route_url(&self, points: &[Coordinates]) -> String {
        // Format coordinates as "lng,lat;lng,lat;..."
        let coordinates_str = points
            .iter()
            .map(|c| format!("{},{}", c.longitude, c.latitude))
            .collect::<Vec<_>>()
            .join(";");

        format!("{}/route/v1/driving/{}", self.base_url, coordinates_str)
    }
}

#[async_trait]
impl RoutingProvider for OsrmClient {
    async fn route(&self, points: &[Coordinates]) -> Result<ProviderRoute, ProviderError> {
        if points.len() < 2 {
            return Err(ProviderError::Malformed(
                "at least 2 points required".to_string(),
            ));
        }

        tracing::debug!(
            points = points.len(),
            "OSRM request: {} points",
            points.len()
        );

        let response = self
            .client
            .get(self.route_url(points))
            .query(&[
                ("overview", "full"),
                ("geometries", self.geometry_format.as_param()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("OSRM", response).await);
        }

        let body: OsrmRouteResponse = response.json().await?;

        match body.code.as_str() {
            "Ok" => {}
            "NoRoute" | "NoSegment" => {
                tracing::warn!(code = %body.code, "OSRM found no route");
                return Err(ProviderError::EmptyResponse);
            }
            other => {
                return Err(ProviderError::Malformed(format!(
                    "OSRM code {}: {}",
                    other,
                    body.message.unwrap_or_default()
                )));
            }
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        tracing::debug!(
            distance_km = %format!("{:.2}", route.distance / 1000.0),
            duration_min = %format!("{:.0}", route.duration / 60.0),
            "OSRM response: {:.2}km, {:.0}min",
            route.distance / 1000.0, route.duration / 60.0
        );

        Ok(ProviderRoute {
            geometry: route.geometry,
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
    }

    fn name(&self) -> &'static str {
        "osrm"
    }
}

// OSRM API response types

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: ProviderGeometry,
    distance: f64, // meters
    duration: f64, // seconds
}
