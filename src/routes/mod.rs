pub mod health;
pub mod saved;
pub mod smartvacay;
pub mod suggest;
pub mod travel;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::models::{PlaceSuggestions, SuggestionMode};
use crate::rate_limit::rate_limit;
use crate::services::places::enrich_with_photos;
use crate::services::suggestions::SuggestionQuery;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let limiter = state.rate_limiter.clone();

    Router::new()
        .route("/suggest/suggestions", post(suggest::suggestions))
        .route("/suggest/route", post(suggest::route))
        .route("/suggest/geocode", get(suggest::geocode))
        .route("/travel/nearby", get(travel::nearby))
        .route("/travel/distant", get(travel::distant))
        .route("/travel/popular", get(travel::popular))
        .route("/travel/cost", post(travel::cost))
        .route("/smartvacay/suggestions", get(smartvacay::suggestions))
        .route("/saved", post(saved::list_routes))
        .route("/saved/save", post(saved::save_route))
        .route("/saved/update", post(saved::update_route))
        .route("/saved/{email}/{route_id}", get(saved::get_route))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit))
        // health stays reachable while a client is throttled
        .route("/debug/health", get(health::health_check))
        .with_state(state)
}

/// Cached suggestions with photos attached. A miss runs the engine, enriches
/// the result and stores it unless the engine had to degrade.
pub(crate) async fn cached_suggestions(
    state: &AppState,
    query: &SuggestionQuery,
    mode: SuggestionMode,
) -> PlaceSuggestions {
    let cache_key = query.cache_key(mode);

    if let Some(cached) = state.cache.get_suggestions(&cache_key).await {
        tracing::info!(mode = %mode.label(), "Cache hit for suggestions: {}", cache_key);
        return cached;
    }

    let mut suggestions = state.suggestions.suggest_places(query, mode).await;

    if let Some(ref places) = state.places {
        enrich_with_photos(places.as_ref(), suggestions.all_places_mut()).await;
    }

    if suggestions.degraded {
        tracing::warn!(
            mode = %mode.label(),
            "Not caching degraded suggestions for {}",
            cache_key
        );
    } else {
        state.cache.cache_suggestions(&cache_key, &suggestions).await;
    }
    suggestions
}
