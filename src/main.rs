use axum::Router;
use routeweaver::cache::{MemoryCacheService, RedisCacheService, SuggestionCache};
use routeweaver::clock::SystemClock;
use routeweaver::config::{Config, RoutingProviderKind};
use routeweaver::constants::DEFAULT_MEMORY_CACHE_MAX_ENTRIES;
use routeweaver::db::{InMemorySavedRouteRepository, PgSavedRouteRepository, SavedRouteRepository};
use routeweaver::rate_limit::RateLimiter;
use routeweaver::services::cost_estimator::CostEstimator;
use routeweaver::services::gemini::{GeminiClient, TextGenerator};
use routeweaver::services::geocoding::{
    GeminiGeocoder, Geocoder, GeocodingService, GoogleGeocoder, NominatimClient,
};
use routeweaver::services::places::{GooglePlacesClient, PlacesProvider};
use routeweaver::services::popular::PopularDestinations;
use routeweaver::services::route_assembly::RouteAssembler;
use routeweaver::services::routing::{GoogleDirectionsClient, OsrmClient, RoutingProvider};
use routeweaver::services::saved_routes::SavedRouteService;
use routeweaver::services::suggestions::SuggestionEngine;
use routeweaver::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routeweaver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting RouteWeaver API server");
    tracing::info!("Configuration loaded successfully");

    // Saved routes: PostgreSQL when configured, otherwise process memory
    let repository: Arc<dyn SavedRouteRepository> = if let Some(ref database_url) = config.database_url {
        tracing::info!("Connecting to database...");
        let db_pool = routeweaver::db::create_pool(database_url).await?;
        tracing::info!("Database connection established");

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Database migrations completed");

        Arc::new(PgSavedRouteRepository::new(db_pool))
    } else {
        tracing::warn!("DATABASE_URL not set. Saved routes are kept in memory only.");
        Arc::new(InMemorySavedRouteRepository::new())
    };

    // Initialize cache: try Redis, fall back to in-memory
    let cache: Arc<dyn SuggestionCache> = if let Some(ref redis_url) = config.redis_url {
        tracing::info!("Connecting to Redis cache...");
        match RedisCacheService::new(redis_url, config.suggestion_cache_ttl).await {
            Ok(redis_cache) => {
                tracing::info!("Redis cache connection established");
                Arc::new(redis_cache)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to connect to Redis: {}. Falling back to in-memory cache.",
                    e
                );
                Arc::new(MemoryCacheService::new(
                    config.suggestion_cache_ttl,
                    DEFAULT_MEMORY_CACHE_MAX_ENTRIES,
                ))
            }
        }
    } else {
        tracing::info!("Redis URL not configured. Using in-memory cache.");
        Arc::new(MemoryCacheService::new(
            config.suggestion_cache_ttl,
            DEFAULT_MEMORY_CACHE_MAX_ENTRIES,
        ))
    };

    // Initialize providers
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        timeout,
    ));

    let routing: Arc<dyn RoutingProvider> = match (config.routing_provider, &config.google_maps_api_key) {
        (RoutingProviderKind::Google, Some(key)) => Arc::new(GoogleDirectionsClient::new(
            key.clone(),
            config.google_maps_base_url.clone(),
            timeout,
        )),
        _ => Arc::new(OsrmClient::new(config.osrm_base_url.clone(), timeout)),
    };

    let nominatim = Arc::new(NominatimClient::new(
        config.nominatim_base_url.clone(),
        timeout,
    ));
    let mut geocoders: Vec<Arc<dyn Geocoder>> = Vec::new();
    if let Some(ref key) = config.google_maps_api_key {
        geocoders.push(Arc::new(GoogleGeocoder::new(
            key.clone(),
            config.google_maps_base_url.clone(),
            timeout,
        )));
    }
    geocoders.push(nominatim.clone());
    geocoders.push(Arc::new(GeminiGeocoder::new(
        generator.clone(),
        config.suggestions.region_name.clone(),
        config.suggestions.region,
    )));
    let geocoding = Arc::new(GeocodingService::new(geocoders));

    let places: Option<Arc<dyn PlacesProvider>> = config.google_maps_api_key.as_ref().map(|key| {
        Arc::new(GooglePlacesClient::new(
            key.clone(),
            config.google_maps_base_url.clone(),
            timeout,
        )) as Arc<dyn PlacesProvider>
    });
    if places.is_none() {
        tracing::warn!("GOOGLE_MAPS_API_KEY not set. Photos and popular destinations are disabled.");
    }
    let popular = places
        .as_ref()
        .map(|p| PopularDestinations::new(geocoding.clone(), p.clone(), cache.clone()));

    let rate_limiter = Arc::new(RateLimiter::new(
        Duration::from_millis(config.rate_limit_window_ms),
        config.rate_limit_max_requests,
        Arc::new(SystemClock),
    ));

    // Create application state
    let state = Arc::new(AppState {
        suggestions: SuggestionEngine::new(generator.clone(), config.suggestions.clone()),
        route_assembler: RouteAssembler::new(routing),
        cost_estimator: CostEstimator::new(generator),
        geocoding,
        reverse_geocoder: nominatim,
        places,
        popular,
        cache,
        saved_routes: SavedRouteService::new(repository),
        rate_limiter,
    });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api", routeweaver::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
