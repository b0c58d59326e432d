use super::RoutingProvider;
use crate::error::{status_error, ProviderError};
use crate::models::{Coordinates, ProviderGeometry, ProviderRoute};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone)]
pub struct GoogleDirectionsClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GoogleDirectionsClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        GoogleDirectionsClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

fn lat_lng(c: &Coordinates) -> String {
    format!("{},{}", c.latitude, c.longitude)
}

#[async_trait]
impl RoutingProvider for GoogleDirectionsClient {
    async fn route(&self, points: &[Coordinates]) -> Result<ProviderRoute, ProviderError> {
        if points.len() < 2 {
            return Err(ProviderError::Malformed(
                "at least 2 points required".to_string(),
            ));
        }
        let origin = &points[0];
        let destination = &points[points.len() - 1];

        let waypoints = points[1..points.len() - 1]
            .iter()
            .map(lat_lng)
            .collect::<Vec<_>>()
            .join("|");

        let mut params = vec![
            ("origin", lat_lng(origin)),
            ("destination", lat_lng(destination)),
            ("mode", "driving".to_string()),
            ("key", self.api_key.clone()),
        ];
        if !waypoints.is_empty() {
            params.push(("waypoints", waypoints));
        }

        tracing::debug!(
            points = points.len(),
            "Google Directions request: {} points",
            points.len()
        );

        let response = self
            .client
            .get(format!("{}/directions/json", self.base_url))
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Google Directions", response).await);
        }

        let body: DirectionsResponse = response.json().await?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => return Err(ProviderError::EmptyResponse),
            other => {
                tracing::warn!(
                    status = other,
                    "Google Directions returned {}: {}",
                    other,
                    body.error_message.as_deref().unwrap_or("")
                );
                return Err(ProviderError::Status {
                    status: 200,
                    body: format!("{} {}", other, body.error_message.unwrap_or_default()),
                });
            }
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let distance_meters = route.legs.iter().map(|l| l.distance.value).sum();
        let duration_seconds = route.legs.iter().map(|l| l.duration.value).sum();

        Ok(ProviderRoute {
            geometry: ProviderGeometry::Polyline(route.overview_polyline.points),
            distance_meters,
            duration_seconds,
        })
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

// Google Directions API response types

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: ValueField,
    duration: ValueField,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_are_summed() {
        let body: DirectionsResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "routes": [{
                    "overview_polyline": {"points": "_p~iF~ps|U"},
                    "legs": [
                        {"distance": {"value": 1000, "text": "1 km"}, "duration": {"value": 60, "text": "1 min"}},
                        {"distance": {"value": 500, "text": "0.5 km"}, "duration": {"value": 30, "text": "1 min"}}
                    ]
                }]
            }"#,
        )
        .unwrap();
        let route = &body.routes[0];
        let total: f64 = route.legs.iter().map(|l| l.distance.value).sum();
        assert_eq!(total, 1500.0);
    }
}
