//! Extracts places from the free-form list a text model returns.
//!
//! Expected lines look like `- Name (Description) [lat, lng]`, but models
//! drift: bold markers, bullets, numbering and missing descriptions all
//! occur. Parsing never fails; unusable lines are skipped.

use crate::constants::{DEFAULT_PLACE_DESCRIPTION, PARSER_MIN_STRICT_MATCHES};
use crate::models::{Coordinates, Place};
use regex::Regex;
use std::sync::OnceLock;

fn coords_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\s*(-?\d+\.?\d*)\s*,\s*(-?\d+\.?\d*)\s*\]")
            .expect("coordinate pattern is valid")
    })
}

// Name (Description)
fn name_with_description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:[-*.]|\d+[.)])\s*)*([^(\[\]]+)\s*\(([^)]+)\)")
            .expect("name pattern is valid")
    })
}

// Name [lat, lng]
fn name_before_coords_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:[-*.]|\d+[.)])\s*)*([^(\[\]]+)\s*\[")
            .expect("name pattern is valid")
    })
}

fn marker_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A bullet or a list number such as "3." or "3)"; bare digits belong to the name
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:[-*.]|\d+[.)])\s*)+").expect("marker pattern is valid")
    })
}

fn distance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*km").expect("distance pattern is valid"))
}

/// Parse model output into places, in input order.
pub fn parse_places(text: &str) -> Vec<Place> {
    let normalized = normalize(text);

    let mut places: Vec<Place> = normalized
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && starts_with_marker(line))
        .filter_map(parse_line)
        .collect();

    if places.len() < PARSER_MIN_STRICT_MATCHES {
        tracing::debug!(
            strict = places.len(),
            "Strict parse found {} places, running loose pass",
            places.len()
        );
        for place in loose_pass(&normalized) {
            let duplicate = places
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(&place.name));
            if !duplicate {
                places.push(place);
            }
        }
    }

    places
}

/// First `<number> km` phrase in a description, e.g. "About 45 km from Kochi".
pub fn extract_distance_km(description: &str) -> Option<f64> {
    distance_re()
        .captures(description)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|km| km.is_finite())
}

fn normalize(text: &str) -> String {
    text.replace("**", "").replace('•', "-")
}

fn starts_with_marker(line: &str) -> bool {
    line.starts_with(|c: char| c == '-' || c == '*' || c == '.' || c.is_ascii_digit())
}

fn parse_line(line: &str) -> Option<Place> {
    let coordinates = extract_coordinates(line)?;

    let (name, description) = if let Some(caps) = name_with_description_re().captures(line) {
        (caps[1].trim().to_string(), caps[2].trim().to_string())
    } else if let Some(caps) = name_before_coords_re().captures(line) {
        (caps[1].trim().to_string(), DEFAULT_PLACE_DESCRIPTION.to_string())
    } else {
        let head = line.split('[').next().unwrap_or_default();
        let head = head.split('(').next().unwrap_or_default();
        (
            marker_prefix_re().replace(head, "").trim().to_string(),
            DEFAULT_PLACE_DESCRIPTION.to_string(),
        )
    };

    if name.is_empty() {
        tracing::debug!("Skipping line without a name: {}", line);
        return None;
    }

    Some(Place::new(name, description, coordinates))
}

/// First bracket pair on the line that holds real coordinates.
fn extract_coordinates(line: &str) -> Option<Coordinates> {
    coords_re()
        .captures_iter(line)
        .find_map(|caps| coordinates_from(&caps[1], &caps[2]))
}

fn coordinates_from(lat: &str, lng: &str) -> Option<Coordinates> {
    let lat = lat.parse::<f64>().ok()?;
    let lng = lng.parse::<f64>().ok()?;
    Coordinates::new(lat, lng).ok()
}

// Any line carrying coordinates, marker or not. The name is the text before
// the first bracket or parenthesis.
fn loose_pass(text: &str) -> Vec<Place> {
    text.lines()
        .filter_map(|line| {
            let coordinates = extract_coordinates(line)?;
            let head = line.split(['[', '(']).next().unwrap_or_default();
            let name = marker_prefix_re().replace(head, "").trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some(Place::new(name, DEFAULT_PLACE_DESCRIPTION, coordinates))
        })
        .collect()
}
