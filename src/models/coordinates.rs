use crate::constants::NULL_ISLAND_EPSILON_DEG;
use crate::geometry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        let coords = Coordinates {
            latitude,
            longitude,
        };
        coords.validate()?;
        Ok(coords)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                self.latitude
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                self.longitude
            ));
        }
        Ok(())
    }

    /// False for non-finite values and for the (0, 0) placeholder that
    /// upstream services emit when they have no answer.
    pub fn is_usable(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && !(self.latitude.abs() < NULL_ISLAND_EPSILON_DEG
                && self.longitude.abs() < NULL_ISLAND_EPSILON_DEG)
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        geometry::haversine_meters(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn distance_km_to(&self, other: &Coordinates) -> f64 {
        self.distance_to(other) / 1000.0
    }

    /// `[longitude, latitude]`, the order used by route geometry.
    pub fn to_lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn is_near(&self, other: &Coordinates, epsilon_deg: f64) -> bool {
        (self.latitude - other.latitude).abs() < epsilon_deg
            && (self.longitude - other.longitude).abs() < epsilon_deg
    }
}

/// Axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegionBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl RegionBounds {
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lng..=self.max_lng).contains(&point.longitude)
    }

    /// Snap `point` into the rectangle when neither axis moves by more than
    /// `tolerance_deg`. Returns `None` when the point is too far out.
    pub fn clamp_within(&self, point: &Coordinates, tolerance_deg: f64) -> Option<Coordinates> {
        let latitude = point.latitude.clamp(self.min_lat, self.max_lat);
        let longitude = point.longitude.clamp(self.min_lng, self.max_lng);

        if (latitude - point.latitude).abs() > tolerance_deg
            || (longitude - point.longitude).abs() > tolerance_deg
        {
            return None;
        }

        Some(Coordinates {
            latitude,
            longitude,
        })
    }
}
