use crate::error::{AppError, Result};
use crate::models::{Place, SuggestionMode};
use crate::routes::cached_suggestions;
use crate::services::suggestions::SuggestionQuery;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_TRIP_DAYS: u32 = 2;
const MAX_TRIP_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacayParams {
    pub location: Option<String>,
    pub trip_days: Option<u32>,
}

impl VacayParams {
    pub fn validate(&self) -> Result<(&str, u32)> {
        let location = self
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| AppError::InvalidRequest("Location parameter is required.".to_string()))?;

        let days = self.trip_days.unwrap_or(DEFAULT_TRIP_DAYS);
        if !(1..=MAX_TRIP_DAYS).contains(&days) {
            return Err(AppError::InvalidRequest(format!(
                "tripDays must be between 1 and {}",
                MAX_TRIP_DAYS
            )));
        }
        Ok((location, days))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacayResponse {
    pub success: bool,
    pub short_distance: Vec<Place>,
    pub medium_distance: Vec<Place>,
    pub long_distance: Vec<Place>,
}

/// GET /smartvacay/suggestions?location&tripDays
/// Destinations grouped into short/medium/long bands for the trip length
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VacayParams>,
) -> Result<Json<VacayResponse>> {
    let (location, days) = params.validate()?;

    tracing::info!(
        days,
        "Vacation suggestions for {} ({} days)",
        location,
        days
    );

    let query = SuggestionQuery::new(location);
    let suggestions =
        cached_suggestions(&state, &query, SuggestionMode::ByTripDuration { days }).await;
    let bands = suggestions.bands.unwrap_or_default();

    Ok(Json(VacayResponse {
        success: true,
        short_distance: bands.short,
        medium_distance: bands.medium,
        long_distance: bands.long,
    }))
}
