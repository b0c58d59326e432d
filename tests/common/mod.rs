use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use routeweaver::cache::MemoryCacheService;
use routeweaver::clock::SystemClock;
use routeweaver::config::SuggestionConfig;
use routeweaver::db::InMemorySavedRouteRepository;
use routeweaver::error::ProviderError;
use routeweaver::models::{
    Confidence, Coordinates, GeocodeResult, GeocodeSource, Place, ProviderGeometry, ProviderRoute,
};
use routeweaver::rate_limit::RateLimiter;
use routeweaver::services::cost_estimator::CostEstimator;
use routeweaver::services::gemini::TextGenerator;
use routeweaver::services::geocoding::{Geocoder, GeocodingService, ReverseGeocoder};
use routeweaver::services::places::PlacesProvider;
use routeweaver::services::popular::PopularDestinations;
use routeweaver::services::route_assembly::RouteAssembler;
use routeweaver::services::routing::RoutingProvider;
use routeweaver::services::saved_routes::SavedRouteService;
use routeweaver::services::suggestions::SuggestionEngine;
use routeweaver::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Eight places between Kochi and Munnar, in the model's list format.
#[allow(dead_code)]
pub const KOCHI_MUNNAR_ANSWER: &str = "\
1. **Cheeyappara Waterfalls** (Seven-step cascade on the Kochi-Madurai highway) [10.0167, 76.8500]
2. **Valara Waterfalls** (Roadside falls in a dense forest) [10.0290, 76.8420]
3. **Thattekad Bird Sanctuary** (Home of the Malabar grey hornbill) [10.1260, 76.6870]
4. **Bhoothathankettu Dam** (Dam with a legend of the bhoothams) [10.1380, 76.6640]
5. **Neriamangalam Bridge** (Historic bridge over the Periyar) [10.0560, 76.7780]
6. **Attukad Waterfalls** (Falls between misty hills) [10.0780, 77.0410]
7. **Mattupetty Dam** (Storage dam with boating) [10.1060, 77.1230]
8. **Kothamangalam** (Gateway town to the high ranges) [10.0600, 76.6350]";

/// Text generator answering by the first rule whose needle occurs in the
/// prompt. Every prompt is recorded. While `outage` is set every call times
/// out.
pub struct RuleGenerator {
    rules: Vec<(&'static str, Result<String, ProviderError>)>,
    default: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
    outage: AtomicBool,
}

#[allow(dead_code)]
impl RuleGenerator {
    pub fn new(default: Result<String, ProviderError>) -> Self {
        RuleGenerator {
            rules: Vec::new(),
            default,
            prompts: Mutex::new(Vec::new()),
            outage: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        Self::new(Err(ProviderError::Timeout))
    }

    pub fn with_rule(mut self, needle: &'static str, answer: Result<String, ProviderError>) -> Self {
        self.rules.push((needle, answer));
        self
    }

    pub fn in_outage(self) -> Self {
        self.outage.store(true, Ordering::SeqCst);
        self
    }

    pub fn recover(&self) {
        self.outage.store(false, Ordering::SeqCst);
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for RuleGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.outage.load(Ordering::SeqCst) {
            return Err(ProviderError::Timeout);
        }
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Routing provider returning a fixed answer.
pub struct StubRouting {
    pub answer: Result<ProviderRoute, ProviderError>,
}

#[allow(dead_code)]
impl StubRouting {
    pub fn straight(distance_meters: f64, duration_seconds: f64) -> Self {
        StubRouting {
            answer: Ok(ProviderRoute {
                geometry: ProviderGeometry::Coordinates(vec![
                    [76.2673, 9.9312],
                    [76.6640, 10.1380],
                    [77.0595, 10.0889],
                ]),
                distance_meters,
                duration_seconds,
            }),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        StubRouting { answer: Err(error) }
    }
}

#[async_trait]
impl RoutingProvider for StubRouting {
    async fn route(&self, _points: &[Coordinates]) -> Result<ProviderRoute, ProviderError> {
        self.answer.clone()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Geocoder that knows a handful of Kerala towns.
pub struct TableGeocoder;

#[async_trait]
impl Geocoder for TableGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>, ProviderError> {
        let point = match query.trim().to_lowercase().as_str() {
            "kochi" => (9.9312, 76.2673),
            "munnar" => (10.0889, 77.0595),
            "thrissur" => (10.5276, 76.2144),
            _ => return Ok(None),
        };
        Ok(Some(GeocodeResult {
            name: query.trim().to_string(),
            coordinates: Coordinates::new(point.0, point.1).unwrap(),
            source: GeocodeSource::Nominatim,
            confidence: Confidence::Medium,
        }))
    }

    fn name(&self) -> &'static str {
        "table"
    }
}

pub struct FixedReverse(pub &'static str);

#[async_trait]
impl ReverseGeocoder for FixedReverse {
    async fn reverse(&self, _point: &Coordinates) -> Result<Option<String>, ProviderError> {
        Ok(Some(self.0.to_string()))
    }
}

/// Photos exist only for dams; every other lookup fails.
pub struct DamPhotos;

#[async_trait]
impl PlacesProvider for DamPhotos {
    async fn places_near(
        &self,
        _center: &Coordinates,
        _radius_m: f64,
        _place_type: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        Ok(vec![
            Place::new("Athirappilly Waterfalls", "", Coordinates::new(10.2851, 76.5698).unwrap()),
            Place::new("Munnar", "", Coordinates::new(10.0889, 77.0595).unwrap()),
        ])
    }

    async fn photo_reference(
        &self,
        name: &str,
        _near: &Coordinates,
    ) -> Result<Option<String>, ProviderError> {
        if name.contains("Dam") {
            Ok(Some(format!("ref-{}", name.replace(' ', "-"))))
        } else {
            Err(ProviderError::Network("connection reset".to_string()))
        }
    }

    fn photo_url(&self, reference: &str) -> String {
        format!("https://photos.test/{}", reference)
    }
}

/// Collaborators for one test app.
pub struct TestDeps {
    pub generator: Arc<RuleGenerator>,
    pub routing: Arc<dyn RoutingProvider>,
    pub places: Option<Arc<dyn PlacesProvider>>,
    pub max_requests: u32,
}

#[allow(dead_code)]
impl TestDeps {
    pub fn new(generator: RuleGenerator) -> Self {
        TestDeps {
            generator: Arc::new(generator),
            routing: Arc::new(StubRouting::straight(120_000.0, 9_000.0)),
            places: None,
            max_requests: 10_000,
        }
    }

    pub fn with_routing(mut self, routing: StubRouting) -> Self {
        self.routing = Arc::new(routing);
        self
    }

    pub fn with_places(mut self, places: impl PlacesProvider + 'static) -> Self {
        self.places = Some(Arc::new(places));
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }
}

#[allow(dead_code)]
pub fn build_state(deps: &TestDeps) -> Arc<AppState> {
    let cache = Arc::new(MemoryCacheService::new(3600, 100));
    let geocoding = Arc::new(GeocodingService::new(vec![Arc::new(TableGeocoder)]));
    let popular = deps
        .places
        .as_ref()
        .map(|p| PopularDestinations::new(geocoding.clone(), p.clone(), cache.clone()));

    Arc::new(AppState {
        suggestions: SuggestionEngine::new(deps.generator.clone(), SuggestionConfig::default()),
        route_assembler: RouteAssembler::new(deps.routing.clone()),
        cost_estimator: CostEstimator::new(deps.generator.clone()),
        geocoding,
        reverse_geocoder: Arc::new(FixedReverse("Kochi, Kerala")),
        places: deps.places.clone(),
        popular,
        cache,
        saved_routes: SavedRouteService::new(Arc::new(InMemorySavedRouteRepository::new())),
        rate_limiter: Arc::new(RateLimiter::new(
            Duration::from_secs(60),
            deps.max_requests,
            Arc::new(SystemClock),
        )),
    })
}

#[allow(dead_code)]
pub fn build_app(deps: &TestDeps) -> axum::Router {
    routeweaver::routes::create_router(build_state(deps))
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
