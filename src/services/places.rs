use crate::error::{status_error, ProviderError};
use crate::models::{Coordinates, Place};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const PHOTO_MAX_WIDTH: u32 = 400;

/// Nearby-place search and photo lookup.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn places_near(
        &self,
        center: &Coordinates,
        radius_m: f64,
        place_type: &str,
    ) -> Result<Vec<Place>, ProviderError>;

    async fn photo_reference(
        &self,
        name: &str,
        near: &Coordinates,
    ) -> Result<Option<String>, ProviderError>;

    fn photo_url(&self, reference: &str) -> String;
}

/// Fill `photo_reference` and `image_url` on every place concurrently.
/// A failed lookup only leaves that place without a photo.
pub async fn enrich_with_photos(provider: &dyn PlacesProvider, places: Vec<&mut Place>) {
    let lookups = places
        .iter()
        .map(|place| provider.photo_reference(&place.name, &place.coordinates));
    let results = join_all(lookups).await;

    let mut found = 0;
    for (place, result) in places.into_iter().zip(results) {
        match result {
            Ok(Some(reference)) => {
                place.image_url = Some(provider.photo_url(&reference));
                place.photo_reference = Some(reference);
                found += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Photo lookup for '{}' failed: {}", place.name, e);
            }
        }
    }
    tracing::debug!("Attached photos to {} places", found);
}

#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GooglePlacesClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        GooglePlacesClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl PlacesProvider for GooglePlacesClient {
    async fn places_near(
        &self,
        center: &Coordinates,
        radius_m: f64,
        place_type: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        let location = format!("{},{}", center.latitude, center.longitude);
        let radius = format!("{}", radius_m.round() as u64);

        let response = self
            .client
            .get(format!("{}/place/nearbysearch/json", self.base_url))
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", place_type),
                ("key", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Google Places", response).await);
        }

        let body: NearbySearchResponse = response.json().await?;
        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            other => {
                return Err(ProviderError::Status {
                    status: 200,
                    body: other.to_string(),
                })
            }
        }

        let places = body
            .results
            .into_iter()
            .filter_map(|r| {
                let coordinates =
                    Coordinates::new(r.geometry.location.lat, r.geometry.location.lng).ok()?;
                let mut place = Place::new(r.name, r.vicinity.unwrap_or_default(), coordinates);
                if let Some(reference) = r.photos.into_iter().next().map(|p| p.photo_reference) {
                    place.image_url = Some(self.photo_url(&reference));
                    place.photo_reference = Some(reference);
                }
                Some(place)
            })
            .collect();

        Ok(places)
    }

    async fn photo_reference(
        &self,
        name: &str,
        near: &Coordinates,
    ) -> Result<Option<String>, ProviderError> {
        let bias = format!("point:{},{}", near.latitude, near.longitude);

        let response = self
            .client
            .get(format!("{}/place/findplacefromtext/json", self.base_url))
            .query(&[
                ("input", name),
                ("inputtype", "textquery"),
                ("fields", "photos"),
                ("locationbias", bias.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Google Places", response).await);
        }

        let body: FindPlaceResponse = response.json().await?;
        Ok(body
            .candidates
            .into_iter()
            .flat_map(|c| c.photos)
            .map(|p| p.photo_reference)
            .next())
    }

    fn photo_url(&self, reference: &str) -> String {
        format!(
            "{}/place/photo?maxwidth={}&photo_reference={}&key={}",
            self.base_url,
            PHOTO_MAX_WIDTH,
            urlencoding::encode(reference),
            urlencoding::encode(&self.api_key)
        )
    }
}

// Google Places API response types

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<NearbyResult>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    name: String,
    vicinity: Option<String>,
    geometry: PlaceGeometry,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<FindPlaceCandidate>,
}

#[derive(Debug, Deserialize)]
struct FindPlaceCandidate {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyPhotos;

    #[async_trait]
    impl PlacesProvider for FlakyPhotos {
        async fn places_near(
            &self,
            _center: &Coordinates,
            _radius_m: f64,
            _place_type: &str,
        ) -> Result<Vec<Place>, ProviderError> {
            Ok(vec![])
        }

        async fn photo_reference(
            &self,
            name: &str,
            _near: &Coordinates,
        ) -> Result<Option<String>, ProviderError> {
            match name {
                "Munnar" => Ok(Some("ref-munnar".to_string())),
                "Thekkady" => Err(ProviderError::Timeout),
                _ => Ok(None),
            }
        }

        fn photo_url(&self, reference: &str) -> String {
            format!("https://photos.test/{}", reference)
        }
    }

    #[tokio::test]
    async fn enrichment_isolates_failures() {
        let coords = Coordinates::new(10.0, 77.0).unwrap();
        let mut places = vec![
            Place::new("Munnar", "", coords),
            Place::new("Thekkady", "", coords),
            Place::new("Vagamon", "", coords),
        ];

        enrich_with_photos(&FlakyPhotos, places.iter_mut().collect()).await;

        assert_eq!(places[0].photo_reference.as_deref(), Some("ref-munnar"));
        assert_eq!(
            places[0].image_url.as_deref(),
            Some("https://photos.test/ref-munnar")
        );
        assert!(places[1].photo_reference.is_none());
        assert!(places[2].image_url.is_none());
    }

    #[test]
    fn photo_url_encodes_reference() {
        let client = GooglePlacesClient::new(
            "k".to_string(),
            "https://maps.test/api".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(
            client.photo_url("a/b"),
            "https://maps.test/api/place/photo?maxwidth=400&photo_reference=a%2Fb&key=k"
        );
    }
}
