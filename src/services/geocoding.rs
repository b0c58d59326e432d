//! Text-to-coordinates lookup across several providers.
//!
//! [`GeocodingService`] asks each provider in order and returns the first
//! answer, tagged with where it came from and how far it can be trusted.

use crate::constants::HTTP_USER_AGENT;
use crate::error::{status_error, ProviderError};
use crate::models::{Confidence, Coordinates, GeocodeResult, GeocodeSource, RegionBounds};
use crate::services::gemini::TextGenerator;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider answered but knows no such place.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>, ProviderError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Human-readable name for a point.
    async fn reverse(&self, point: &Coordinates) -> Result<Option<String>, ProviderError>;
}

/// Ordered provider chain.
pub struct GeocodingService {
    providers: Vec<Arc<dyn Geocoder>>,
}

impl GeocodingService {
    pub fn new(providers: Vec<Arc<dyn Geocoder>>) -> Self {
        GeocodingService { providers }
    }

    /// First successful answer. Provider errors are logged and skipped.
    pub async fn geocode(&self, query: &str) -> Option<GeocodeResult> {
        for provider in &self.providers {
            match provider.geocode(query).await {
                Ok(Some(result)) if result.coordinates.is_usable() => {
                    tracing::info!(
                        provider = provider.name(),
                        "Geocoded '{}' via {} to ({:.4}, {:.4})",
                        query,
                        provider.name(),
                        result.coordinates.latitude,
                        result.coordinates.longitude
                    );
                    return Some(result);
                }
                Ok(_) => {
                    tracing::debug!(provider = provider.name(), "No geocode result for '{}'", query);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        "Geocoding '{}' via {} failed: {}",
                        query,
                        provider.name(),
                        e
                    );
                }
            }
        }
        None
    }
}

// --- Google ---

#[derive(Clone)]
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GoogleGeocoder {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        GoogleGeocoder {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleGeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResult {
    formatted_address: Option<String>,
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Debug, Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/geocode/json", self.base_url))
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Google Geocoding", response).await);
        }

        let body: GoogleGeocodeResponse = response.json().await?;
        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            other => {
                return Err(ProviderError::Status {
                    status: 200,
                    body: other.to_string(),
                })
            }
        }

        let Some(first) = body.results.into_iter().next() else {
            return Ok(None);
        };
        let coordinates =
            Coordinates::new(first.geometry.location.lat, first.geometry.location.lng)
                .map_err(ProviderError::Malformed)?;

        Ok(Some(GeocodeResult {
            name: first.formatted_address.unwrap_or_else(|| query.to_string()),
            coordinates,
            source: GeocodeSource::Google,
            confidence: Confidence::High,
        }))
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

// --- Nominatim ---

#[derive(Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl NominatimClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        NominatimClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl NominatimAddress {
    /// Most specific locality, with the state when known: "Kochi, Kerala".
    fn short_name(&self) -> Option<String> {
        let locality = self
            .city
            .as_ref()
            .or(self.town.as_ref())
            .or(self.village.as_ref())
            .or(self.county.as_ref())?;
        Some(match &self.state {
            Some(state) => format!("{}, {}", locality, state),
            None => locality.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, HTTP_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Nominatim", response).await);
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let Some(first) = places.into_iter().next() else {
            return Ok(None);
        };

        let lat = first
            .lat
            .parse::<f64>()
            .map_err(|e| ProviderError::Malformed(format!("latitude: {}", e)))?;
        let lng = first
            .lon
            .parse::<f64>()
            .map_err(|e| ProviderError::Malformed(format!("longitude: {}", e)))?;
        let coordinates = Coordinates::new(lat, lng).map_err(ProviderError::Malformed)?;

        Ok(Some(GeocodeResult {
            name: first.display_name.unwrap_or_else(|| query.to_string()),
            coordinates,
            source: GeocodeSource::Nominatim,
            confidence: Confidence::Medium,
        }))
    }

    fn name(&self) -> &'static str {
        "nominatim"
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, point: &Coordinates) -> Result<Option<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .header(reqwest::header::USER_AGENT, HTTP_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Nominatim", response).await);
        }

        let body: NominatimReverse = response.json().await?;
        Ok(body.address.short_name().or(body.display_name))
    }
}

// --- Gemini ---

/// Asks the text model for coordinates. Last resort for landmarks the map
/// services don't index.
pub struct GeminiGeocoder {
    generator: Arc<dyn TextGenerator>,
    region_name: String,
    region: RegionBounds,
}

impl GeminiGeocoder {
    pub fn new(generator: Arc<dyn TextGenerator>, region_name: String, region: RegionBounds) -> Self {
        GeminiGeocoder {
            generator,
            region_name,
            region,
        }
    }

    fn prompt(&self, query: &str) -> String {
        format!(
            "I need precise geographical coordinates (latitude and longitude) for \"{query}\".\n\n\
             This is likely a place in {region} that might be a natural landmark, tourist attraction, \
             or local feature that isn't properly indexed in standard geocoding services.\n\n\
             Respond with ONLY a JSON object in this EXACT format:\n\
             {{\n  \"name\": \"full official name of the place\",\n  \"coordinates\": {{\n    \
             \"latitude\": numeric latitude value,\n    \"longitude\": numeric longitude value\n  }},\n  \
             \"confidence\": \"high/medium/low\"\n}}\n\n\
             If this is in {region}, coordinates should be within these ranges:\n\
             - Latitude: between {min_lat} and {max_lat}\n\
             - Longitude: between {min_lng} and {max_lng}\n\n\
             For natural landmarks like hills, waterfalls, or lakes, provide coordinates for the main \
             access point or viewing area.",
            query = query,
            region = self.region_name,
            min_lat = self.region.min_lat,
            max_lat = self.region.max_lat,
            min_lng = self.region.min_lng,
            max_lng = self.region.max_lng,
        )
    }
}

#[derive(Debug, Deserialize)]
struct GeminiGeocodeAnswer {
    name: Option<String>,
    coordinates: Coordinates,
    confidence: Option<String>,
}

fn json_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("object pattern is valid"))
}

fn latitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)latitude["\s:]+(-?\d+\.\d+)"#).expect("latitude pattern is valid")
    })
}

fn longitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)longitude["\s:]+(-?\d+\.\d+)"#).expect("longitude pattern is valid")
    })
}

/// Interpret the model's answer. A JSON object is preferred; otherwise
/// bare `latitude`/`longitude` mentions are recovered with low confidence.
pub fn parse_gemini_geocode(
    query: &str,
    text: &str,
    region_name: &str,
    region: &RegionBounds,
) -> Result<GeocodeResult, ProviderError> {
    let Some(object) = json_object_re().find(text) else {
        let lat = latitude_re()
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok());
        let lng = longitude_re()
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok());

        return match (lat, lng) {
            (Some(lat), Some(lng)) => Ok(GeocodeResult {
                name: query.to_string(),
                coordinates: Coordinates::new(lat, lng).map_err(ProviderError::Malformed)?,
                source: GeocodeSource::Gemini,
                confidence: Confidence::Low,
            }),
            _ => Err(ProviderError::Malformed(
                "no coordinates in model answer".to_string(),
            )),
        };
    };

    let answer: GeminiGeocodeAnswer = serde_json::from_str(object.as_str())
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    answer
        .coordinates
        .validate()
        .map_err(ProviderError::Malformed)?;

    let mut confidence = answer
        .confidence
        .as_deref()
        .map(Confidence::parse_loose)
        .unwrap_or(Confidence::Medium);

    // The query names the region but the answer lands outside it
    let region_word = region_name
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if !region_word.is_empty()
        && query.to_lowercase().contains(&region_word)
        && !region.contains(&answer.coordinates)
    {
        tracing::warn!(
            "Coordinates for '{}' are outside {}, lowering confidence",
            query,
            region_name
        );
        confidence = Confidence::Low;
    }

    Ok(GeocodeResult {
        name: answer
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| query.to_string()),
        coordinates: answer.coordinates,
        source: GeocodeSource::Gemini,
        confidence,
    })
}

#[async_trait]
impl Geocoder for GeminiGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>, ProviderError> {
        let text = self.generator.generate(&self.prompt(query)).await?;
        parse_gemini_geocode(query, &text, &self.region_name, &self.region).map(Some)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
