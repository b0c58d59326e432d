//! Stable application-wide constants.
//!
//! Values here are structural invariants, algorithm coefficients, and default
//! fallbacks for env-var-based configuration. Tuning knobs for the suggestion
//! engine live in [`SuggestionConfig`](crate::config::SuggestionConfig).

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "5000";

// --- Provider defaults ---

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OSRM_BASE_URL: &str = "http://router.project-osrm.org";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
/// Nominatim rejects requests without an identifying User-Agent.
pub const HTTP_USER_AGENT: &str = "routeweaver/0.1";
/// Per-request timeout for every outbound HTTP call. Overridden by `HTTP_TIMEOUT_SECS`.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// --- Cache defaults ---

/// Suggestion cache TTL: 24 hours. Overridden by `SUGGESTION_CACHE_TTL`.
pub const DEFAULT_SUGGESTION_CACHE_TTL_SECONDS: u64 = 86_400;
/// Maximum entries for the in-memory suggestion cache.
pub const DEFAULT_MEMORY_CACHE_MAX_ENTRIES: u64 = 1_000;

// --- Rate limiting defaults ---

pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 1_000;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 10;

// --- Geometry ---

/// Mean Earth radius used by every haversine computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
/// Coordinates closer than this (degrees, on both axes) to (0, 0) are treated
/// as a missing value rather than a real location.
pub const NULL_ISLAND_EPSILON_DEG: f64 = 0.01;
/// Two suggestions closer than this (degrees, on both axes) are the same place.
pub const DUPLICATE_COORDINATE_EPSILON_DEG: f64 = 0.01;

// --- Route assembly ---

/// Assumed driving speed for fallback routes: 60 km/h.
pub const FALLBACK_SPEED_METERS_PER_SECOND: f64 = 60_000.0 / 3_600.0;
/// Interpolated points per leg of a curved fallback route.
pub const FALLBACK_POINTS_PER_LEG: usize = 16;
/// Bow of the curved fallback, as a fraction of each leg's length in degrees.
pub const FALLBACK_CURVE_FACTOR: f64 = 0.08;

// --- Suggestion engine ---

pub const DEFAULT_SUGGESTION_KEYWORD: &str = "tourist attractions";
/// Description used when a line names a place but carries no description.
pub const DEFAULT_PLACE_DESCRIPTION: &str = "A popular tourist attraction";
/// The parser runs its loose second pass below this many results.
pub const PARSER_MIN_STRICT_MATCHES: usize = 3;
/// Near-origin mode: primary set radius.
pub const NEARBY_MAX_KM: f64 = 80.0;
/// Near-origin mode: secondary set ring.
pub const DISTANT_MIN_KM: f64 = 100.0;
pub const DISTANT_MAX_KM: f64 = 1_000.0;
/// Trip-duration mode uses the weekend bands at or below this many days.
pub const SHORT_TRIP_MAX_DAYS: u32 = 1;
/// Word-overlap ratio above which two destination names are the same place.
pub const NAME_WORD_OVERLAP_THRESHOLD: f64 = 0.5;

// --- Popular destinations ---

pub const POPULAR_DEFAULT_MIN_KM: f64 = 30.0;
pub const POPULAR_DEFAULT_MAX_KM: f64 = 150.0;
pub const POPULAR_DEFAULT_LIMIT: usize = 4;
/// Number of concentric rings searched between the min and max radius.
pub const POPULAR_SEARCH_RINGS: usize = 5;
pub const POPULAR_PLACE_TYPE: &str = "tourist_attraction";

// --- Cost estimation ---

pub const DEFAULT_NUM_PEOPLE: u32 = 2;
pub const UNKNOWN_TOTAL_COST: &str = "unknown";

// --- Saved routes ---

/// Client-side placeholder meaning "assign the next id".
pub const AUTO_ROUTE_ID: &str = "x";
pub const ROUTE_DATA_SEPARATOR: char = '|';
