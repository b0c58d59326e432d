// Library exports for testing and reusability

pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod geometry;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};

use cache::SuggestionCache;
use rate_limit::RateLimiter;
use services::cost_estimator::CostEstimator;
use services::geocoding::{GeocodingService, ReverseGeocoder};
use services::places::PlacesProvider;
use services::popular::PopularDestinations;
use services::route_assembly::RouteAssembler;
use services::saved_routes::SavedRouteService;
use services::suggestions::SuggestionEngine;
use std::sync::Arc;

// App state for sharing across the application
pub struct AppState {
    pub suggestions: SuggestionEngine,
    pub route_assembler: RouteAssembler,
    pub cost_estimator: CostEstimator,
    pub geocoding: Arc<GeocodingService>,
    pub reverse_geocoder: Arc<dyn ReverseGeocoder>,
    /// Photos and popular destinations need a places provider.
    pub places: Option<Arc<dyn PlacesProvider>>,
    pub popular: Option<PopularDestinations>,
    pub cache: Arc<dyn SuggestionCache>,
    pub saved_routes: SavedRouteService,
    pub rate_limiter: Arc<RateLimiter>,
}
