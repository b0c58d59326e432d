use crate::constants::*;
use crate::models::RegionBounds;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingProviderKind {
    #[default]
    Osrm,
    Google,
}

impl std::str::FromStr for RoutingProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "osrm" => Ok(RoutingProviderKind::Osrm),
            "google" => Ok(RoutingProviderKind::Google),
            _ => Err(format!(
                "Invalid routing provider: {}. Use 'osrm' or 'google'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Saved routes live in memory when unset.
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Enables Google geocoding, places, photos and directions.
    pub google_maps_api_key: Option<String>,
    pub google_maps_base_url: String,
    pub osrm_base_url: String,
    pub nominatim_base_url: String,
    pub routing_provider: RoutingProviderKind,
    pub http_timeout_secs: u64,
    pub suggestion_cache_ttl: u64,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: u32,
    pub suggestions: SuggestionConfig,
}

#[derive(Debug, Clone)]
pub struct SuggestionConfig {
    /// Human-readable region named in prompts, e.g. "Kerala, India".
    pub region_name: String,

    /// Rectangle every suggested place must fall inside.
    pub region: RegionBounds,

    /// Largest per-axis correction (degrees) applied when snapping an
    /// out-of-region place back inside. Beyond this the place is dropped.
    pub clamp_tolerance_deg: f64,

    /// Places requested per prompt; below this a retry prompt is issued.
    pub target_count: usize,

    /// Fixed fallback places are appended until this many are present.
    pub fill_target: usize,

    /// Trip-duration bands are rebalanced towards this minimum.
    pub min_band_size: usize,

    /// Along-route places further than this from the origin-destination
    /// segment are discarded.
    pub corridor_km: f64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            region_name: "Kerala, India".to_string(),
            region: RegionBounds {
                min_lat: 8.2,
                max_lat: 12.8,
                min_lng: 74.8,
                max_lng: 77.8,
            },
            clamp_tolerance_deg: 0.5,
            target_count: 8,
            fill_target: 10,
            min_band_size: 3,
            corridor_km: 60.0,
        }
    }
}

impl SuggestionConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let region = RegionBounds {
            min_lat: env::var("REGION_MIN_LAT")
                .unwrap_or_else(|_| defaults.region.min_lat.to_string())
                .parse()
                .map_err(|_| "Invalid REGION_MIN_LAT")?,
            max_lat: env::var("REGION_MAX_LAT")
                .unwrap_or_else(|_| defaults.region.max_lat.to_string())
                .parse()
                .map_err(|_| "Invalid REGION_MAX_LAT")?,
            min_lng: env::var("REGION_MIN_LNG")
                .unwrap_or_else(|_| defaults.region.min_lng.to_string())
                .parse()
                .map_err(|_| "Invalid REGION_MIN_LNG")?,
            max_lng: env::var("REGION_MAX_LNG")
                .unwrap_or_else(|_| defaults.region.max_lng.to_string())
                .parse()
                .map_err(|_| "Invalid REGION_MAX_LNG")?,
        };

        if region.min_lat >= region.max_lat || region.min_lng >= region.max_lng {
            return Err("REGION bounds must satisfy min < max on both axes".to_string());
        }

        Ok(Self {
            region_name: env::var("REGION_NAME").unwrap_or(defaults.region_name),
            region,

            clamp_tolerance_deg: env::var("REGION_CLAMP_TOLERANCE_DEG")
                .unwrap_or_else(|_| defaults.clamp_tolerance_deg.to_string())
                .parse()
                .map_err(|_| "Invalid REGION_CLAMP_TOLERANCE_DEG")?,

            target_count: env::var("SUGGESTION_TARGET_COUNT")
                .unwrap_or_else(|_| defaults.target_count.to_string())
                .parse()
                .map_err(|_| "Invalid SUGGESTION_TARGET_COUNT")?,

            fill_target: env::var("SUGGESTION_FILL_TARGET")
                .unwrap_or_else(|_| defaults.fill_target.to_string())
                .parse()
                .map_err(|_| "Invalid SUGGESTION_FILL_TARGET")?,

            min_band_size: env::var("MIN_BAND_SIZE")
                .unwrap_or_else(|_| defaults.min_band_size.to_string())
                .parse()
                .map_err(|_| "Invalid MIN_BAND_SIZE")?,

            corridor_km: env::var("ROUTE_CORRIDOR_KM")
                .unwrap_or_else(|_| defaults.corridor_km.to_string())
                .parse()
                .map_err(|_| "Invalid ROUTE_CORRIDOR_KM")?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let routing_provider: RoutingProviderKind = env::var("ROUTING_PROVIDER")
            .unwrap_or_else(|_| "osrm".to_string())
            .parse()?;

        let google_maps_api_key = env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        if routing_provider == RoutingProviderKind::Google && google_maps_api_key.is_none() {
            return Err("ROUTING_PROVIDER=google requires GOOGLE_MAPS_API_KEY".to_string());
        }

        let http_timeout_secs: u64 = env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid HTTP_TIMEOUT_SECS")?;

        if http_timeout_secs == 0 {
            return Err("HTTP_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: env::var("DATABASE_URL").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").map_err(|_| "GEMINI_API_KEY must be set")?,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            google_maps_api_key,
            google_maps_base_url: env::var("GOOGLE_MAPS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_MAPS_BASE_URL.to_string()),
            osrm_base_url: env::var("OSRM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OSRM_BASE_URL.to_string()),
            nominatim_base_url: env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_NOMINATIM_BASE_URL.to_string()),
            routing_provider,
            http_timeout_secs,
            suggestion_cache_ttl: env::var("SUGGESTION_CACHE_TTL")
                .unwrap_or_else(|_| DEFAULT_SUGGESTION_CACHE_TTL_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid SUGGESTION_CACHE_TTL")?,
            rate_limit_window_ms: env::var("RATE_LIMIT_WINDOW_MS")
                .unwrap_or_else(|_| DEFAULT_RATE_LIMIT_WINDOW_MS.to_string())
                .parse()
                .map_err(|_| "Invalid RATE_LIMIT_WINDOW_MS")?,
            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| DEFAULT_RATE_LIMIT_MAX_REQUESTS.to_string())
                .parse()
                .map_err(|_| "Invalid RATE_LIMIT_MAX_REQUESTS")?,
            suggestions: SuggestionConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "GEMINI_API_KEY",
        "ROUTING_PROVIDER",
        "GOOGLE_MAPS_API_KEY",
        "PORT",
        "HTTP_TIMEOUT_SECS",
        "REGION_MIN_LAT",
        "REGION_MAX_LAT",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { env::remove_var(var) };
        }
    }

    fn set(var: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized.
        unsafe { env::set_var(var, value) };
    }

    #[test]
    fn routing_provider_parses_case_insensitively() {
        assert_eq!(
            "OSRM".parse::<RoutingProviderKind>().unwrap(),
            RoutingProviderKind::Osrm
        );
        assert_eq!(
            "google".parse::<RoutingProviderKind>().unwrap(),
            RoutingProviderKind::Google
        );
        assert!("mapbox".parse::<RoutingProviderKind>().is_err());
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_key_is_set() {
        clear_env();
        set("GEMINI_API_KEY", "test-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.routing_provider, RoutingProviderKind::Osrm);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(config.suggestions.target_count, 8);
        assert_eq!(config.suggestions.region.min_lat, 8.2);
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_gemini_key_is_an_error() {
        clear_env();
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn google_routing_requires_maps_key() {
        clear_env();
        set("GEMINI_API_KEY", "test-key");
        set("ROUTING_PROVIDER", "google");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("GOOGLE_MAPS_API_KEY"));
        clear_env();
    }

    #[test]
    #[serial]
    fn inverted_region_is_rejected() {
        clear_env();
        set("GEMINI_API_KEY", "test-key");
        set("REGION_MIN_LAT", "13.0");
        set("REGION_MAX_LAT", "12.0");

        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_port_is_rejected() {
        clear_env();
        set("GEMINI_API_KEY", "test-key");
        set("PORT", "not-a-port");

        assert_eq!(Config::from_env().unwrap_err(), "Invalid PORT");
        clear_env();
    }
}
