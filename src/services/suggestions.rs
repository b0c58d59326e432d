//! Place suggestions from a text model.
//!
//! Every mode follows the same shape: one prompt, a second prompt that
//! excludes the first answer's names, region validation, and a fixed
//! fallback list when the model comes up short. The engine never fails;
//! provider errors count as zero candidates.

use crate::config::SuggestionConfig;
use crate::constants::*;
use crate::geometry::{
    bucket_by_distance, point_to_segment_distance_m, rebalance_bands, truncate_bands,
};
use crate::models::{BandKind, Coordinates, Place, PlaceSuggestions, SuggestionMode, TripBands};
use crate::services::gemini::TextGenerator;
use crate::services::place_parser::{extract_distance_km, parse_places};
use std::sync::Arc;

/// What the caller asked for, independent of mode.
#[derive(Debug, Clone, Default)]
pub struct SuggestionQuery {
    pub origin: String,
    pub destination: Option<String>,
    pub keyword: String,
    pub origin_coordinates: Option<Coordinates>,
    pub destination_coordinates: Option<Coordinates>,
}

impl SuggestionQuery {
    pub fn new(origin: impl Into<String>) -> Self {
        SuggestionQuery {
            origin: origin.into(),
            ..Default::default()
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn with_coordinates(
        mut self,
        origin: Option<Coordinates>,
        destination: Option<Coordinates>,
    ) -> Self {
        self.origin_coordinates = origin;
        self.destination_coordinates = destination;
        self
    }

    fn keyword_or_default(&self) -> &str {
        let keyword = self.keyword.trim();
        if keyword.is_empty() {
            DEFAULT_SUGGESTION_KEYWORD
        } else {
            keyword
        }
    }

    /// Cache key covering mode, endpoints and keyword.
    pub fn cache_key(&self, mode: SuggestionMode) -> String {
        format!(
            "suggest:{}:{}:{}:{}",
            mode.label(),
            self.origin.trim().to_lowercase(),
            self.destination
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase(),
            self.keyword_or_default().to_lowercase()
        )
    }
}

/// Where a candidate may lie, beyond the region rectangle.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Anywhere,
    Corridor {
        start: Coordinates,
        end: Coordinates,
        max_km: f64,
    },
    Window {
        min_km: f64,
        max_km: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DistanceSource {
    /// Straight-line distance from the origin coordinates.
    Haversine,
    /// The "N km" phrase in the description, then haversine.
    Description,
}

pub struct SuggestionEngine {
    generator: Arc<dyn TextGenerator>,
    config: SuggestionConfig,
}

impl SuggestionEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, config: SuggestionConfig) -> Self {
        SuggestionEngine { generator, config }
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub async fn suggest_places(
        &self,
        query: &SuggestionQuery,
        mode: SuggestionMode,
    ) -> PlaceSuggestions {
        let suggestions = match mode {
            SuggestionMode::AlongRoute => self.along_route(query).await,
            SuggestionMode::NearOrigin => self.near_origin(query).await,
            SuggestionMode::ByTripDuration { days } => self.by_trip_duration(query, days).await,
        };

        tracing::info!(
            mode = %mode.label(),
            origin = %query.origin,
            primary = suggestions.primary.len(),
            secondary = suggestions.secondary.len(),
            banded = suggestions.bands.as_ref().map(|b| b.len()).unwrap_or(0),
            "Suggestions ready"
        );

        suggestions
    }

    async fn along_route(&self, query: &SuggestionQuery) -> PlaceSuggestions {
        let destination = query.destination.as_deref().unwrap_or(&query.origin);
        let scope = match (query.origin_coordinates, query.destination_coordinates) {
            (Some(start), Some(end)) => Scope::Corridor {
                start,
                end,
                max_km: self.config.corridor_km,
            },
            _ => Scope::Anywhere,
        };
        let mode = SuggestionMode::AlongRoute;
        let mut degraded = false;

        let prompt = self.along_route_prompt(query, destination, &[]);
        let first = self
            .refine(
                self.ask(&prompt, &mut degraded).await,
                query,
                scope,
                DistanceSource::Haversine,
            )
            .into_iter()
            .take(self.config.target_count)
            .collect();
        let first = self
            .top_up(first, query, scope, DistanceSource::Haversine, mode, &mut degraded)
            .await;

        let excluded = names_of(&first);
        let prompt = self.along_route_prompt(query, destination, &excluded);
        let second = self.refine(
            self.ask(&prompt, &mut degraded).await,
            query,
            scope,
            DistanceSource::Haversine,
        );
        let second = exclude_overlaps(&first, second, self.config.target_count);

        PlaceSuggestions {
            primary: first,
            secondary: second,
            bands: None,
            degraded,
        }
    }

    async fn near_origin(&self, query: &SuggestionQuery) -> PlaceSuggestions {
        let nearby_scope = Scope::Window {
            min_km: 0.0,
            max_km: NEARBY_MAX_KM,
        };
        let distant_scope = Scope::Window {
            min_km: DISTANT_MIN_KM,
            max_km: DISTANT_MAX_KM,
        };
        let mode = SuggestionMode::NearOrigin;
        let mut degraded = false;

        let prompt = self.nearby_prompt(query);
        let nearby = self
            .refine(
                self.ask(&prompt, &mut degraded).await,
                query,
                nearby_scope,
                DistanceSource::Description,
            )
            .into_iter()
            .take(self.config.target_count)
            .collect();
        let nearby = self
            .top_up(
                nearby,
                query,
                nearby_scope,
                DistanceSource::Description,
                mode,
                &mut degraded,
            )
            .await;

        let excluded = names_of(&nearby);
        let prompt = self.distant_prompt(query, &excluded);
        let distant = self.refine(
            self.ask(&prompt, &mut degraded).await,
            query,
            distant_scope,
            DistanceSource::Description,
        );
        let distant = exclude_overlaps(&nearby, distant, self.config.target_count);

        PlaceSuggestions {
            primary: nearby,
            secondary: distant,
            bands: None,
            degraded,
        }
    }

    async fn by_trip_duration(&self, query: &SuggestionQuery, days: u32) -> PlaceSuggestions {
        let days = days.max(1);
        let bands = TripBands::for_days(days);
        let mode = SuggestionMode::ByTripDuration { days };
        let scope = Scope::Anywhere;
        let source = DistanceSource::Description;
        let mut degraded = false;

        let prompt = self.trip_prompt(query, days, &bands, &[]);
        let first = self.refine(self.ask(&prompt, &mut degraded).await, query, scope, source);

        let excluded = names_of(&first);
        let prompt = self.trip_prompt(query, days, &bands, &excluded);
        let second = self.refine(self.ask(&prompt, &mut degraded).await, query, scope, source);
        let capacity = first.len() + second.len();
        let mut pool = first.clone();
        pool.extend(exclude_overlaps(&first, second, capacity));

        let pool = self
            .top_up(pool, query, scope, source, mode, &mut degraded)
            .await;
        let pool = remove_near_duplicates(pool);

        let unknown_band = if days <= SHORT_TRIP_MAX_DAYS {
            BandKind::Medium
        } else {
            BandKind::Long
        };
        let mut banded = bucket_by_distance(pool, &bands, unknown_band);
        tracing::debug!(
            short = banded.short.len(),
            medium = banded.medium.len(),
            long = banded.long.len(),
            "Bucketed trip candidates"
        );
        rebalance_bands(&mut banded, self.config.min_band_size);
        truncate_bands(&mut banded, &bands);

        PlaceSuggestions {
            primary: Vec::new(),
            secondary: Vec::new(),
            bands: Some(banded),
            degraded,
        }
    }

    /// Re-prompt once when short, then append fixed fallbacks.
    async fn top_up(
        &self,
        mut places: Vec<Place>,
        query: &SuggestionQuery,
        scope: Scope,
        source: DistanceSource,
        mode: SuggestionMode,
        degraded: &mut bool,
    ) -> Vec<Place> {
        if places.len() >= self.config.target_count {
            return places;
        }

        tracing::debug!(
            found = places.len(),
            "Only {} places, re-prompting once",
            places.len()
        );
        let prompt = self.retry_prompt(query, mode, &names_of(&places));
        let retried = self.refine(self.ask(&prompt, degraded).await, query, scope, source);
        let room = self.config.fill_target.saturating_sub(places.len());
        let retried = exclude_overlaps(&places, retried, room);
        places.extend(retried);

        if places.len() >= self.config.target_count {
            return places;
        }

        *degraded = true;
        let fallbacks = fallback_places(query, mode);
        let fallbacks = self.refine(fallbacks, query, scope, source);
        let before = places.len();
        for fallback in fallbacks {
            if places.len() >= self.config.fill_target {
                break;
            }
            let taken = places
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(&fallback.name));
            if !taken {
                places.push(fallback);
            }
        }
        tracing::warn!(
            mode = %mode.label(),
            added = places.len() - before,
            "Model returned too few places, appended fallbacks"
        );

        places
    }

    async fn ask(&self, prompt: &str, degraded: &mut bool) -> Vec<Place> {
        match self.generator.generate(prompt).await {
            Ok(text) => {
                let places = parse_places(&text);
                tracing::debug!("Parsed {} places from model output", places.len());
                places
            }
            Err(e) => {
                tracing::warn!("Text generation failed, treating as no candidates: {}", e);
                *degraded = true;
                Vec::new()
            }
        }
    }

    /// Region check, distance annotation, scope filter and exact-name dedup.
    fn refine(
        &self,
        places: Vec<Place>,
        query: &SuggestionQuery,
        scope: Scope,
        source: DistanceSource,
    ) -> Vec<Place> {
        let mut kept: Vec<Place> = Vec::with_capacity(places.len());

        for mut place in places {
            if !place.coordinates.is_usable() {
                tracing::debug!("Dropping '{}': unusable coordinates", place.name);
                continue;
            }

            if !self.config.region.contains(&place.coordinates) {
                match self
                    .config
                    .region
                    .clamp_within(&place.coordinates, self.config.clamp_tolerance_deg)
                {
                    Some(clamped) => {
                        tracing::debug!(
                            "Clamped '{}' from [{}, {}] into region",
                            place.name,
                            place.coordinates.latitude,
                            place.coordinates.longitude
                        );
                        place.coordinates = clamped;
                    }
                    None => {
                        tracing::debug!("Dropping '{}': outside region", place.name);
                        continue;
                    }
                }
            }

            annotate_distance(&mut place, query.origin_coordinates, source);

            if !in_scope(&place, scope) {
                tracing::debug!("Dropping '{}': outside requested area", place.name);
                continue;
            }

            if kept.iter().any(|k| k.name.eq_ignore_ascii_case(&place.name)) {
                continue;
            }
            kept.push(place);
        }

        kept
    }

    fn region_clause(&self) -> String {
        let r = &self.config.region;
        format!(
            "{} ({}-{} latitude, {}-{} longitude)",
            self.config.region_name, r.min_lat, r.max_lat, r.min_lng, r.max_lng
        )
    }

    fn along_route_prompt(
        &self,
        query: &SuggestionQuery,
        destination: &str,
        excluded: &[String],
    ) -> String {
        let origin = &query.origin;
        let count = self.config.target_count;
        let different = if excluded.is_empty() {
            String::new()
        } else {
            format!(
                "\n- Places must be DIFFERENT from: {}",
                excluded.join(", ")
            )
        };

        format!(
            "List {count} {more}popular tourist attractions with their coordinates that are STRICTLY located along or directly adjacent to the main driving route from {origin} to {destination}.

Requirements:
- Places MUST be within 5-10km of the main road route between {origin} and {destination}
- Places must be directly accessible from the main route with minimal detours{different}
- Only include genuine, well-known tourist attractions in {region}
- Distribute places evenly along the entire route
- Focus on attractions related to: {keyword}
- For each place, give the approximate distance from the main route in km
- Use PRECISE, ACCURATE coordinates for each location

Format each place as:
- [Place Name] ([Brief Description including approximate distance from main route in km]) [latitude, longitude]",
            more = if excluded.is_empty() { "" } else { "more " },
            region = self.region_clause(),
            keyword = query.keyword_or_default(),
        )
    }

    fn nearby_prompt(&self, query: &SuggestionQuery) -> String {
        let origin = &query.origin;
        format!(
            "List {count} popular tourist attractions within {max}km of {origin} with their coordinates, inside {region}. These should be diverse places including natural attractions, historic sites, cultural spots, and entertainment venues. Each should be a distinct type of attraction. Format each place as:
- [Place Name] ([Brief Description]) [latitude, longitude]
Include the approximate distance in km from {origin} in the description.",
            count = self.config.target_count,
            max = NEARBY_MAX_KM,
            region = self.region_clause(),
        )
    }

    fn distant_prompt(&self, query: &SuggestionQuery, excluded: &[String]) -> String {
        let origin = &query.origin;
        format!(
            "List {count} popular tourist attractions between {min}km and {max}km from {origin} with their coordinates, inside {region}. These should be major tourist destinations worth traveling longer distances to visit. Include diverse options like beach destinations, mountain retreats, historic cities, and natural wonders. Each should be distinct from the others and from these nearby places: {excluded}. Format each place as:
- [Place Name] ([Brief Description]) [latitude, longitude]
Include the approximate distance in km from {origin} in the description.",
            count = self.config.target_count,
            min = DISTANT_MIN_KM,
            max = DISTANT_MAX_KM,
            region = self.region_clause(),
            excluded = excluded.join(", "),
        )
    }

    fn trip_prompt(
        &self,
        query: &SuggestionQuery,
        days: u32,
        bands: &TripBands,
        excluded: &[String],
    ) -> String {
        let origin = &query.origin;
        let day_trip = days <= SHORT_TRIP_MAX_DAYS;
        let (first, second, third) = if day_trip {
            ("day trip", "farther day trips", "ambitious day trips")
        } else {
            (
                "the first day of a longer trip",
                "good for a multi-day trip",
                "destinations worth an overnight stay",
            )
        };
        let different = if excluded.is_empty() {
            String::new()
        } else {
            format!("\n- None of these places may appear: {}", excluded.join(", "))
        };

        format!(
            "I need a selection of tourist attractions near {origin} with their precise coordinates for a {days}-day trip:

1. First, list {sc} popular attractions within {smin}-{smax}km of {origin} (ideal for a {first}).
2. Then, list {mc} attractions between {mmin}-{mmax}km from {origin} ({second}).
3. Finally, list {lc} attractions between {lmin}-{lmax}km from {origin} ({third}).

Requirements:
- Each place MUST be completely different from all others
- Include diverse attractions: natural sites, historical places, adventure spots, cultural destinations
- EVERY place MUST have ACCURATE latitude and longitude coordinates within {region}
- The distance from {origin} MUST be within the specified range for each category
- Include the EXACT distance from {origin} in kilometers in each description{different}

Format each place exactly as:
- [Place Name] ([Brief description including EXACT distance from {origin} in km]) [latitude, longitude]",
            sc = bands.short.count,
            smin = bands.short.min_km,
            smax = bands.short.max_km,
            mc = bands.medium.count,
            mmin = bands.medium.min_km,
            mmax = bands.medium.max_km,
            lc = bands.long.count,
            lmin = bands.long.min_km,
            lmax = bands.long.max_km,
            region = self.region_clause(),
        )
    }

    fn retry_prompt(&self, query: &SuggestionQuery, mode: SuggestionMode, excluded: &[String]) -> String {
        let origin = &query.origin;
        let area = match mode {
            SuggestionMode::AlongRoute => format!(
                "along the driving route from {} to {}",
                origin,
                query.destination.as_deref().unwrap_or(origin)
            ),
            SuggestionMode::NearOrigin => format!("within {}km of {}", NEARBY_MAX_KM, origin),
            SuggestionMode::ByTripDuration { days } => {
                format!("near {} for a {}-day trip", origin, days)
            }
        };
        let different = if excluded.is_empty() {
            String::new()
        } else {
            format!("\n- Do not repeat any of: {}", excluded.join(", "))
        };

        format!(
            "I need at least {count} diverse tourist attractions {area} with precise coordinates.

Requirements:
- Each place MUST have a different name and be a different type of attraction
- Focus on: {keyword}
- Only provide attractions within {region}
- Include the distance from {origin} in kilometers in each description{different}

Format each entry exactly as:
- [Place Name] ([Brief description with distance from {origin} in km]) [latitude, longitude]",
            count = self.config.fill_target,
            keyword = query.keyword_or_default(),
            region = self.region_clause(),
        )
    }
}

fn names_of(places: &[Place]) -> Vec<String> {
    places.iter().map(|p| p.name.clone()).collect()
}

fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

fn annotate_distance(place: &mut Place, origin: Option<Coordinates>, source: DistanceSource) {
    let from_description = match source {
        DistanceSource::Description => extract_distance_km(&place.description),
        DistanceSource::Haversine => None,
    };
    let km = from_description.or_else(|| {
        origin.map(|o| round_km(o.distance_km_to(&place.coordinates)))
    });
    if km.is_some() {
        place.distance_from_origin_km = km;
    }
}

fn in_scope(place: &Place, scope: Scope) -> bool {
    match scope {
        Scope::Anywhere => true,
        Scope::Corridor { start, end, max_km } => {
            point_to_segment_distance_m(&place.coordinates, &start, &end) / 1000.0 <= max_km
        }
        // Unknown distances are given the benefit of the doubt.
        Scope::Window { min_km, max_km } => place
            .distance_from_origin_km
            .map(|km| km >= min_km && km <= max_km)
            .unwrap_or(true),
    }
}

/// Two places overlap when one name contains the other, ignoring case, or
/// when their coordinates are within a hundredth of a degree.
fn overlaps(a: &Place, b: &Place) -> bool {
    let a_name = a.name.to_lowercase();
    let b_name = b.name.to_lowercase();
    a_name.contains(&b_name)
        || b_name.contains(&a_name)
        || a.coordinates
            .is_near(&b.coordinates, DUPLICATE_COORDINATE_EPSILON_DEG)
}

/// Candidates that overlap neither `kept` nor an earlier candidate, at most `limit`.
fn exclude_overlaps(kept: &[Place], candidates: Vec<Place>, limit: usize) -> Vec<Place> {
    let mut accepted: Vec<Place> = Vec::new();
    for candidate in candidates {
        if accepted.len() >= limit {
            break;
        }
        let seen = kept
            .iter()
            .chain(accepted.iter())
            .any(|p| overlaps(p, &candidate));
        if seen {
            tracing::debug!("Filtered overlapping place: {}", candidate.name);
        } else {
            accepted.push(candidate);
        }
    }
    accepted
}

fn normalize_name(name: &str) -> String {
    let stripped: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Containment, or more than half of the shorter name's words shared.
/// A word counts as shared when it equals or contains a word of the other name.
pub(crate) fn similar_names(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }

    let words_a: Vec<&str> = a.split(' ').collect();
    let words_b: Vec<&str> = b.split(' ').collect();
    let common = words_a
        .iter()
        .filter(|wa| {
            words_b
                .iter()
                .any(|wb| wa == &wb || wb.contains(**wa) || wa.contains(*wb))
        })
        .count();

    let shorter = words_a.len().min(words_b.len()) as f64;
    common as f64 / shorter > NAME_WORD_OVERLAP_THRESHOLD
}

fn remove_near_duplicates(places: Vec<Place>) -> Vec<Place> {
    let total = places.len();
    let mut unique: Vec<Place> = Vec::with_capacity(total);
    for place in places {
        if unique.iter().any(|u| similar_names(&u.name, &place.name)) {
            tracing::debug!("Filtered near-duplicate destination: {}", place.name);
        } else {
            unique.push(place);
        }
    }
    tracing::debug!("Removed {} near-duplicate destinations", total - unique.len());
    unique
}

struct Landmark {
    name: &'static str,
    blurb: &'static str,
    latitude: f64,
    longitude: f64,
}

const DAY_TRIP_FALLBACKS: &[Landmark] = &[
    Landmark { name: "Vagamon", blurb: "Hill station with meadows and pine forests", latitude: 9.6867, longitude: 76.9344 },
    Landmark { name: "Illikkal Kallu", blurb: "Popular trekking spot", latitude: 9.7564, longitude: 76.8422 },
    Landmark { name: "Thattekad Bird Sanctuary", blurb: "Bird watching paradise", latitude: 10.1017, longitude: 76.7431 },
    Landmark { name: "Athirappilly Waterfalls", blurb: "Breathtaking waterfall", latitude: 10.2850, longitude: 76.5696 },
];

const MULTI_DAY_FALLBACKS: &[Landmark] = &[
    Landmark { name: "Munnar", blurb: "Hill station and tea gardens", latitude: 10.0889, longitude: 77.0595 },
    Landmark { name: "Thekkady", blurb: "Home to Periyar Wildlife Sanctuary", latitude: 9.5833, longitude: 77.1667 },
    Landmark { name: "Wayanad", blurb: "Hill district with wildlife and plantations", latitude: 11.6854, longitude: 76.1320 },
    Landmark { name: "Kovalam Beach", blurb: "Popular beach destination", latitude: 8.4004, longitude: 76.9787 },
];

const COMMON_FALLBACKS: &[Landmark] = &[
    Landmark { name: "Alleppey Backwaters", blurb: "Famous backwaters and houseboat destination", latitude: 9.4981, longitude: 76.3388 },
    Landmark { name: "Fort Kochi", blurb: "Historic area with colonial architecture", latitude: 9.9658, longitude: 76.2421 },
    Landmark { name: "Bekal Fort", blurb: "Historic seaside fort", latitude: 12.3917, longitude: 75.0327 },
    Landmark { name: "Kumarakom", blurb: "Peaceful backwater destination", latitude: 9.6144, longitude: 76.4254 },
];

/// City aliases used to place a named origin when no coordinates came along.
const KNOWN_ORIGINS: &[(&[&str], f64, f64)] = &[
    (&["kochi", "cochin", "ernakulam"], 9.9312, 76.2673),
    (&["trivandrum", "thiruvananthapuram"], 8.5241, 76.9366),
    (&["kozhikode", "calicut"], 11.2588, 75.7804),
    (&["thrissur", "trichur"], 10.5276, 76.2144),
];

fn reference_point(query: &SuggestionQuery) -> Option<Coordinates> {
    if query.origin_coordinates.is_some() {
        return query.origin_coordinates;
    }
    let origin = query.origin.to_lowercase();
    KNOWN_ORIGINS
        .iter()
        .find(|(aliases, _, _)| aliases.iter().any(|a| origin.contains(a)))
        .map(|(_, latitude, longitude)| Coordinates {
            latitude: *latitude,
            longitude: *longitude,
        })
}

/// Hardcoded places for when the model under-delivers.
fn fallback_places(query: &SuggestionQuery, mode: SuggestionMode) -> Vec<Place> {
    let lists: [&[Landmark]; 3] = match mode {
        SuggestionMode::ByTripDuration { days } if days > SHORT_TRIP_MAX_DAYS => {
            [MULTI_DAY_FALLBACKS, COMMON_FALLBACKS, DAY_TRIP_FALLBACKS]
        }
        _ => [DAY_TRIP_FALLBACKS, COMMON_FALLBACKS, MULTI_DAY_FALLBACKS],
    };
    let reference = reference_point(query);

    lists
        .iter()
        .flat_map(|list| list.iter())
        .map(|landmark| {
            let coordinates = Coordinates {
                latitude: landmark.latitude,
                longitude: landmark.longitude,
            };
            let description = match reference {
                Some(from) => format!(
                    "{} ({} km from {})",
                    landmark.blurb,
                    from.distance_km_to(&coordinates).round(),
                    query.origin
                ),
                None => landmark.blurb.to_string(),
            };
            Place::new(landmark.name, description, coordinates)
        })
        .collect()
}
