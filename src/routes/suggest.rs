use crate::error::{AppError, Result};
use crate::models::{Coordinates, GeocodeResult, PlaceSuggestions, Route, RouteRequest, SuggestionMode};
use crate::routes::cached_suggestions;
use crate::services::suggestions::SuggestionQuery;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub keyword: Option<String>,
    /// Enables the corridor filter together with `destination_coordinates`.
    #[serde(default)]
    pub origin_coordinates: Option<Coordinates>,
    #[serde(default)]
    pub destination_coordinates: Option<Coordinates>,
}

impl SuggestRequest {
    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Origin and destination are required".to_string(),
            ));
        }
        for coords in [&self.origin_coordinates, &self.destination_coordinates]
            .into_iter()
            .flatten()
        {
            coords.validate().map_err(AppError::InvalidRequest)?;
        }
        Ok(())
    }

    fn to_query(&self) -> SuggestionQuery {
        SuggestionQuery::new(self.origin.trim())
            .with_destination(self.destination.trim())
            .with_keyword(self.keyword.clone().unwrap_or_default())
            .with_coordinates(self.origin_coordinates, self.destination_coordinates)
    }
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub suggestions: PlaceSuggestions,
}

/// POST /suggest/suggestions
/// Attractions along the drive from origin to destination
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<SuggestionsResponse>> {
    request.validate()?;

    tracing::info!(
        origin = %request.origin,
        destination = %request.destination,
        "Suggestion request: {} -> {}",
        request.origin,
        request.destination
    );

    let suggestions =
        cached_suggestions(&state, &request.to_query(), SuggestionMode::AlongRoute).await;

    Ok(Json(SuggestionsResponse {
        success: true,
        suggestions,
    }))
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub success: bool,
    pub route: Route,
}

/// POST /suggest/route
/// Route from origin to destination through the selected places
pub async fn route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>> {
    request.origin.validate().map_err(AppError::InvalidRequest)?;
    request
        .destination
        .validate()
        .map_err(AppError::InvalidRequest)?;

    tracing::info!(
        waypoints = request.waypoints.len(),
        provider = state.route_assembler.provider_name(),
        "Route request: ({:.4}, {:.4}) -> ({:.4}, {:.4})",
        request.origin.latitude,
        request.origin.longitude,
        request.destination.latitude,
        request.destination.longitude
    );

    let route = state
        .route_assembler
        .build_route(request.origin, request.destination, request.waypoints)
        .await;

    Ok(Json(RouteResponse {
        success: true,
        route,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    pub place: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: GeocodeResult,
}

/// GET /suggest/geocode?place=
pub async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<GeocodeResponse>> {
    let place = params
        .place
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Place parameter is required".to_string()))?;

    let result = state.geocoding.geocode(place).await.ok_or_else(|| {
        AppError::NotFound(format!(
            "Could not find coordinates for \"{}\" after trying multiple services",
            place
        ))
    })?;

    Ok(Json(GeocodeResponse {
        success: true,
        result,
    }))
}
