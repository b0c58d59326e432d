use crate::constants::{AUTO_ROUTE_ID, ROUTE_DATA_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored route row: one user's route id and its encoded data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRoute {
    pub id: i64,
    pub route_data: String,
}

/// A place as persisted inside a saved route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlace {
    pub name: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl SavedPlace {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        SavedPlace {
            name: name.into(),
            lat,
            lng,
            checked: None,
        }
    }
}

/// Decoded form of `SavedRoute::route_data`:
/// `origin|destination|lat,lng,urlEncodedName|...`
#[derive(Debug, Clone, PartialEq)]
pub struct RouteData {
    pub origin: String,
    pub destination: String,
    pub places: Vec<SavedPlace>,
}

impl RouteData {
    /// Origin and destination are stored raw, so they must not contain the
    /// field separator.
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        places: Vec<SavedPlace>,
    ) -> Result<Self, String> {
        let origin = origin.into();
        let destination = destination.into();

        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err("origin and destination are required".to_string());
        }
        if origin.contains(ROUTE_DATA_SEPARATOR) || destination.contains(ROUTE_DATA_SEPARATOR) {
            return Err(format!(
                "origin and destination must not contain '{}'",
                ROUTE_DATA_SEPARATOR
            ));
        }
        if let Some(bad) = places
            .iter()
            .find(|p| !p.lat.is_finite() || !p.lng.is_finite())
        {
            return Err(format!("place '{}' has invalid coordinates", bad.name));
        }

        Ok(RouteData {
            origin,
            destination,
            places,
        })
    }

    pub fn encode(&self) -> String {
        let places = self
            .places
            .iter()
            .map(|p| format!("{},{},{}", p.lat, p.lng, urlencoding::encode(&p.name)))
            .collect::<Vec<_>>()
            .join("|");

        format!("{}|{}|{}", self.origin, self.destination, places)
    }

    /// Lenient decode: place segments that don't carry `lat,lng,name` or
    /// whose numbers don't parse are skipped.
    pub fn decode(encoded: &str) -> Option<Self> {
        let mut parts = encoded.split(ROUTE_DATA_SEPARATOR);
        let origin = parts.next()?.to_string();
        let destination = parts.next()?.to_string();

        let places = parts
            .filter_map(|segment| {
                let mut fields = segment.splitn(3, ',');
                let lat = fields.next()?.trim().parse::<f64>().ok()?;
                let lng = fields.next()?.trim().parse::<f64>().ok()?;
                let raw_name = fields.next()?;
                let name = urlencoding::decode(raw_name)
                    .map(|n| n.into_owned())
                    .unwrap_or_else(|_| raw_name.to_string());
                Some(SavedPlace::new(name, lat, lng))
            })
            .collect();

        Some(RouteData {
            origin,
            destination,
            places,
        })
    }
}

/// Route id in a save request: a number, or `"x"` for "assign one".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RouteIdRequest {
    #[default]
    Auto,
    Explicit(i64),
}

impl fmt::Display for RouteIdRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteIdRequest::Auto => write!(f, "{}", AUTO_ROUTE_ID),
            RouteIdRequest::Explicit(id) => write!(f, "{}", id),
        }
    }
}

impl<'de> Deserialize<'de> for RouteIdRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(RouteIdRequest::Explicit(id)),
            Raw::Text(text) if text.trim() == AUTO_ROUTE_ID => Ok(RouteIdRequest::Auto),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(RouteIdRequest::Explicit)
                .map_err(|_| serde::de::Error::custom(format!("invalid route id: {}", text))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRouteRequest {
    pub email: String,
    #[serde(default)]
    pub id: RouteIdRequest,
    pub origin: String,
    pub destination: String,
    pub selected_places: Vec<SavedPlace>,
}

impl SaveRouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_email(&self.email)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRoutesRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    pub email: String,
    pub route_id: i64,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub places: Vec<SavedPlace>,
}

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Serialize)]
pub struct SavedRouteDetail {
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub places: Vec<SavedPlace>,
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email is required".to_string());
    }
    if !email.contains('@') {
        return Err(format!("invalid email: {}", email));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_matches_stored_layout() {
        let data = RouteData::new(
            "Kochi",
            "Munnar",
            vec![
                SavedPlace::new("Cheeyappara Falls", 10.0, 76.8),
                SavedPlace::new("Valara", 10.05, 76.9),
            ],
        )
        .unwrap();

        assert_eq!(
            data.encode(),
            "Kochi|Munnar|10,76.8,Cheeyappara%20Falls|10.05,76.9,Valara"
        );
    }

    #[test]
    fn round_trip_preserves_names_with_reserved_characters() {
        let data = RouteData::new(
            "Kochi, Kerala",
            "Munnar",
            vec![SavedPlace::new("Tea Museum | Kannan Devan, Munnar", 10.09, 77.06)],
        )
        .unwrap();

        let decoded = RouteData::decode(&data.encode()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn decode_skips_malformed_segments() {
        let decoded = RouteData::decode("Kochi|Munnar|garbage|10.0,76.8|10.1,77.0,Mattupetty").unwrap();
        assert_eq!(decoded.places.len(), 1);
        assert_eq!(decoded.places[0].name, "Mattupetty");
    }

    #[test]
    fn decode_without_places() {
        let decoded = RouteData::decode("Kochi|Munnar|").unwrap();
        assert_eq!(decoded.origin, "Kochi");
        assert!(decoded.places.is_empty());
        assert!(RouteData::decode("only-origin").is_none());
    }

    #[test]
    fn separator_in_origin_is_rejected() {
        assert!(RouteData::new("Kochi|Ernakulam", "Munnar", vec![]).is_err());
    }

    #[test]
    fn route_id_accepts_auto_number_and_numeric_string() {
        let auto: RouteIdRequest = serde_json::from_str(r#""x""#).unwrap();
        assert_eq!(auto, RouteIdRequest::Auto);
        let num: RouteIdRequest = serde_json::from_str("42").unwrap();
        assert_eq!(num, RouteIdRequest::Explicit(42));
        let text: RouteIdRequest = serde_json::from_str(r#""7""#).unwrap();
        assert_eq!(text, RouteIdRequest::Explicit(7));
        assert!(serde_json::from_str::<RouteIdRequest>(r#""abc""#).is_err());
    }

    #[test]
    fn saved_place_accepts_long_field_names() {
        let place: SavedPlace = serde_json::from_str(
            r#"{"name":"Munnar","latitude":10.08,"longitude":77.05}"#,
        )
        .unwrap();
        assert_eq!(place.lat, 10.08);
    }
}
