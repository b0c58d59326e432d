use crate::models::Coordinates;
use serde::{Deserialize, Serialize};

/// A point of interest as suggested to, and selected by, the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_origin_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl Place {
    pub fn new(name: impl Into<String>, description: impl Into<String>, coordinates: Coordinates) -> Self {
        Place {
            name: name.into().trim().to_string(),
            description: description.into(),
            coordinates,
            distance_from_origin_km: None,
            photo_reference: None,
            image_url: None,
            checked: None,
        }
    }

    pub fn with_distance_km(mut self, km: f64) -> Self {
        self.distance_from_origin_km = Some(km);
        self
    }
}

/// Which constraint the suggestion engine applies when prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionMode {
    AlongRoute,
    NearOrigin,
    ByTripDuration { days: u32 },
}

impl SuggestionMode {
    /// Stable label used in cache keys and logs.
    pub fn label(&self) -> String {
        match self {
            SuggestionMode::AlongRoute => "along-route".to_string(),
            SuggestionMode::NearOrigin => "near-origin".to_string(),
            SuggestionMode::ByTripDuration { days } => format!("trip-{}d", days),
        }
    }
}

/// Inclusive distance range from the origin, in kilometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceBand {
    pub min_km: f64,
    pub max_km: f64,
    /// How many places the band keeps after rebalancing.
    pub count: usize,
}

impl DistanceBand {
    pub const fn new(min_km: f64, max_km: f64, count: usize) -> Self {
        DistanceBand {
            min_km,
            max_km,
            count,
        }
    }

    pub fn contains(&self, km: f64) -> bool {
        km >= self.min_km && km <= self.max_km
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandKind {
    Short,
    Medium,
    Long,
}

impl BandKind {
    pub const ALL: [BandKind; 3] = [BandKind::Short, BandKind::Medium, BandKind::Long];
}

/// The short/medium/long band layout for a trip length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripBands {
    pub short: DistanceBand,
    pub medium: DistanceBand,
    pub long: DistanceBand,
}

impl TripBands {
    pub fn for_days(days: u32) -> Self {
        if days <= crate::constants::SHORT_TRIP_MAX_DAYS {
            TripBands {
                short: DistanceBand::new(30.0, 60.0, 6),
                medium: DistanceBand::new(60.0, 100.0, 3),
                long: DistanceBand::new(100.0, 150.0, 1),
            }
        } else {
            TripBands {
                short: DistanceBand::new(60.0, 100.0, 2),
                medium: DistanceBand::new(100.0, 250.0, 5),
                long: DistanceBand::new(250.0, 400.0, 3),
            }
        }
    }

    pub fn get(&self, kind: BandKind) -> &DistanceBand {
        match kind {
            BandKind::Short => &self.short,
            BandKind::Medium => &self.medium,
            BandKind::Long => &self.long,
        }
    }
}

/// Places grouped by distance band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandedPlaces {
    pub short: Vec<Place>,
    pub medium: Vec<Place>,
    pub long: Vec<Place>,
}

impl BandedPlaces {
    pub fn get(&self, kind: BandKind) -> &Vec<Place> {
        match kind {
            BandKind::Short => &self.short,
            BandKind::Medium => &self.medium,
            BandKind::Long => &self.long,
        }
    }

    pub fn get_mut(&mut self, kind: BandKind) -> &mut Vec<Place> {
        match kind {
            BandKind::Short => &mut self.short,
            BandKind::Medium => &mut self.medium,
            BandKind::Long => &mut self.long,
        }
    }

    pub fn len(&self) -> usize {
        self.short.len() + self.medium.len() + self.long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output of the suggestion engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestions {
    pub primary: Vec<Place>,
    pub secondary: Vec<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<BandedPlaces>,
    /// Set when a generator call failed or fixed fallbacks filled the gap.
    /// Such results are served but never cached.
    #[serde(skip)]
    pub degraded: bool,
}

impl PlaceSuggestions {
    pub fn all_places(&self) -> impl Iterator<Item = &Place> {
        let banded = self
            .bands
            .iter()
            .flat_map(|b| b.short.iter().chain(b.medium.iter()).chain(b.long.iter()));
        self.primary.iter().chain(self.secondary.iter()).chain(banded)
    }

    pub fn all_places_mut(&mut self) -> Vec<&mut Place> {
        let mut places: Vec<&mut Place> = self
            .primary
            .iter_mut()
            .chain(self.secondary.iter_mut())
            .collect();
        if let Some(bands) = self.bands.as_mut() {
            places.extend(
                bands
                    .short
                    .iter_mut()
                    .chain(bands.medium.iter_mut())
                    .chain(bands.long.iter_mut()),
            );
        }
        places
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeSource {
    Google,
    Nominatim,
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Lenient parse of a model-reported confidence; unknown values are medium.
    pub fn parse_loose(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodeResult {
    pub name: String,
    pub coordinates: Coordinates,
    pub source: GeocodeSource,
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_serializes_camel_case_and_skips_empty_fields() {
        let place = Place::new("  Munnar ", "Hill station", Coordinates::new(10.0889, 77.0595).unwrap())
            .with_distance_km(88.5);
        let json = serde_json::to_value(&place).unwrap();

        assert_eq!(json["name"], "Munnar");
        assert_eq!(json["distanceFromOriginKm"], 88.5);
        assert_eq!(json["coordinates"]["latitude"], 10.0889);
        assert!(json.get("imageUrl").is_none());
        assert!(json.get("checked").is_none());
    }

    #[test]
    fn weekend_trip_bands() {
        let bands = TripBands::for_days(1);
        assert_eq!(bands.short, DistanceBand::new(30.0, 60.0, 6));
        assert_eq!(bands.medium.count, 3);
        assert_eq!(bands.long.max_km, 150.0);
    }

    #[test]
    fn longer_trip_bands() {
        let bands = TripBands::for_days(3);
        assert_eq!(bands.short, DistanceBand::new(60.0, 100.0, 2));
        assert_eq!(bands.medium, DistanceBand::new(100.0, 250.0, 5));
        assert_eq!(bands.long, DistanceBand::new(250.0, 400.0, 3));
    }

    #[test]
    fn confidence_parse_is_lenient() {
        assert_eq!(Confidence::parse_loose(" HIGH "), Confidence::High);
        assert_eq!(Confidence::parse_loose("low"), Confidence::Low);
        assert_eq!(Confidence::parse_loose("somewhat"), Confidence::Medium);
    }

    #[test]
    fn mode_labels_are_distinct() {
        assert_ne!(
            SuggestionMode::ByTripDuration { days: 1 }.label(),
            SuggestionMode::ByTripDuration { days: 2 }.label()
        );
        assert_eq!(SuggestionMode::AlongRoute.label(), "along-route");
    }
}
