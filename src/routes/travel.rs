use crate::constants::{POPULAR_DEFAULT_LIMIT, POPULAR_DEFAULT_MAX_KM, POPULAR_DEFAULT_MIN_KM};
use crate::error::{AppError, ProviderError, Result};
use crate::models::{CostEstimate, CostRequest, Coordinates, Place, PlaceSuggestions, SuggestionMode};
use crate::routes::cached_suggestions;
use crate::services::suggestions::SuggestionQuery;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a near-origin search starts: a point, or a place name.
#[derive(Debug, Deserialize)]
pub struct OriginParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NearOriginResponse {
    pub success: bool,
    pub origin: String,
    pub places: Vec<Place>,
}

/// Name and, when known, coordinates of the search origin.
async fn resolve_origin(
    state: &AppState,
    params: &OriginParams,
) -> Result<(String, Option<Coordinates>)> {
    match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => {
            let point = Coordinates::new(lat, lng).map_err(AppError::InvalidRequest)?;
            let name = match state.reverse_geocoder.reverse(&point).await {
                Ok(Some(name)) => name,
                Ok(None) => format!("{:.4}, {:.4}", lat, lng),
                Err(e) => {
                    tracing::warn!("Reverse geocoding ({:.4}, {:.4}) failed: {}", lat, lng, e);
                    format!("{:.4}, {:.4}", lat, lng)
                }
            };
            Ok((name, Some(point)))
        }
        (None, None) => {
            let location = params
                .location
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| {
                    AppError::InvalidRequest(
                        "Missing latitude or longitude parameters".to_string(),
                    )
                })?;
            let point = state.geocoding.geocode(location).await.map(|r| r.coordinates);
            Ok((location.to_string(), point))
        }
        _ => Err(AppError::InvalidRequest(
            "Missing latitude or longitude parameters".to_string(),
        )),
    }
}

async fn near_origin(
    state: &AppState,
    params: &OriginParams,
) -> Result<(String, PlaceSuggestions)> {
    let (origin, point) = resolve_origin(state, params).await?;
    let query = SuggestionQuery::new(origin.clone()).with_coordinates(point, None);
    let suggestions = cached_suggestions(state, &query, SuggestionMode::NearOrigin).await;
    Ok((origin, suggestions))
}

/// GET /travel/nearby
/// Attractions within a day's reach of the origin
pub async fn nearby(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OriginParams>,
) -> Result<Json<NearOriginResponse>> {
    let (origin, suggestions) = near_origin(&state, &params).await?;
    tracing::info!("Nearby places for {}: {}", origin, suggestions.primary.len());

    Ok(Json(NearOriginResponse {
        success: true,
        origin,
        places: suggestions.primary,
    }))
}

/// GET /travel/distant
/// Longer-trip destinations, sharing the cached near-origin result
pub async fn distant(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OriginParams>,
) -> Result<Json<NearOriginResponse>> {
    let (origin, suggestions) = near_origin(&state, &params).await?;
    tracing::info!("Distant places for {}: {}", origin, suggestions.secondary.len());

    Ok(Json(NearOriginResponse {
        success: true,
        origin,
        places: suggestions.secondary,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularParams {
    pub origin: Option<String>,
    #[serde(default = "default_min_km")]
    pub min_km: f64,
    #[serde(default = "default_max_km")]
    pub max_km: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_min_km() -> f64 {
    POPULAR_DEFAULT_MIN_KM
}

fn default_max_km() -> f64 {
    POPULAR_DEFAULT_MAX_KM
}

fn default_limit() -> usize {
    POPULAR_DEFAULT_LIMIT
}

impl PopularParams {
    pub fn validate(&self) -> Result<&str> {
        let origin = self
            .origin
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or_else(|| AppError::InvalidRequest("Origin is required".to_string()))?;

        if !self.min_km.is_finite() || !self.max_km.is_finite() || self.min_km < 0.0 {
            return Err(AppError::InvalidRequest(
                "minKm and maxKm must be non-negative numbers".to_string(),
            ));
        }
        if self.max_km <= self.min_km {
            return Err(AppError::InvalidRequest(
                "maxKm must be greater than minKm".to_string(),
            ));
        }
        if self.limit == 0 {
            return Err(AppError::InvalidRequest(
                "limit must be at least 1".to_string(),
            ));
        }
        Ok(origin)
    }
}

#[derive(Debug, Serialize)]
pub struct PopularResponse {
    pub success: bool,
    pub origin: String,
    pub destinations: Vec<Place>,
}

/// GET /travel/popular?origin&minKm&maxKm&limit
pub async fn popular(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularParams>,
) -> Result<Json<PopularResponse>> {
    let origin = params.validate()?;
    let popular = state
        .popular
        .as_ref()
        .ok_or(AppError::Provider(ProviderError::NotConfigured("places")))?;

    let destinations = popular
        .find(origin, params.min_km, params.max_km, params.limit)
        .await?;

    Ok(Json(PopularResponse {
        success: true,
        origin: origin.to_string(),
        destinations,
    }))
}

#[derive(Debug, Serialize)]
pub struct CostResponse {
    pub success: bool,
    #[serde(flatten)]
    pub estimate: CostEstimate,
}

/// POST /travel/cost
pub async fn cost(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CostRequest>,
) -> Result<Json<CostResponse>> {
    request.validate().map_err(AppError::InvalidRequest)?;

    let estimate = state
        .cost_estimator
        .estimate_cost(
            request.origin.trim(),
            request.destination.trim(),
            &request.places,
            request.num_people,
        )
        .await;

    Ok(Json(CostResponse {
        success: true,
        estimate,
    }))
}
