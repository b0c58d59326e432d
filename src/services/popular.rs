use crate::cache::{popular_cache_key, SuggestionCache};
use crate::constants::{POPULAR_PLACE_TYPE, POPULAR_SEARCH_RINGS};
use crate::error::{AppError, ProviderError, Result};
use crate::geometry;
use crate::models::{Coordinates, Place, PlaceSuggestions};
use crate::services::geocoding::GeocodingService;
use crate::services::places::PlacesProvider;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

/// Well-known attractions in a distance window around an origin, searched
/// on concentric rings and cached per origin and window.
pub struct PopularDestinations {
    geocoding: Arc<GeocodingService>,
    places: Arc<dyn PlacesProvider>,
    cache: Arc<dyn SuggestionCache>,
}

impl PopularDestinations {
    pub fn new(
        geocoding: Arc<GeocodingService>,
        places: Arc<dyn PlacesProvider>,
        cache: Arc<dyn SuggestionCache>,
    ) -> Self {
        PopularDestinations {
            geocoding,
            places,
            cache,
        }
    }

    /// Up to `limit` places between `min_km` and `max_km` from `origin`, in
    /// shuffled order.
    pub async fn find(
        &self,
        origin: &str,
        min_km: f64,
        max_km: f64,
        limit: usize,
    ) -> Result<Vec<Place>> {
        let key = popular_cache_key(origin, min_km, max_km);
        if let Some(cached) = self.cache.get_suggestions(&key).await {
            tracing::debug!("Popular destinations served from cache: {}", key);
            return Ok(cached.primary.into_iter().take(limit).collect());
        }

        let center = self
            .geocoding
            .geocode(origin)
            .await
            .ok_or_else(|| AppError::InvalidRequest("Could not geocode origin location".to_string()))?
            .coordinates;

        let found = self.search_rings(&center, min_km, max_km).await?;
        let destinations = geometry::shuffle(&within_window(found, &center, min_km, max_km));

        tracing::info!(
            origin,
            found = destinations.len(),
            "Popular destinations between {} and {} km",
            min_km,
            max_km
        );

        // empty answers are not pinned for a whole TTL
        if !destinations.is_empty() {
            let entry = PlaceSuggestions {
                primary: destinations.clone(),
                ..Default::default()
            };
            self.cache.cache_suggestions(&key, &entry).await;
        }

        Ok(destinations.into_iter().take(limit).collect())
    }

    /// One nearby search per ring, run concurrently. Fails only when every
    /// ring failed.
    async fn search_rings(
        &self,
        center: &Coordinates,
        min_km: f64,
        max_km: f64,
    ) -> std::result::Result<Vec<Place>, ProviderError> {
        let searches = ring_radii_m(min_km, max_km)
            .into_iter()
            .map(|radius| self.places.places_near(center, radius, POPULAR_PLACE_TYPE));
        let results = join_all(searches).await;

        let mut places = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;
        for result in results {
            match result {
                Ok(found) => {
                    succeeded += 1;
                    places.extend(found);
                }
                Err(e) => {
                    tracing::warn!("Ring search failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match (succeeded, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(places),
        }
    }
}

/// Evenly spaced radii from `min_km` to `max_km`, in meters.
pub fn ring_radii_m(min_km: f64, max_km: f64) -> Vec<f64> {
    let step = (max_km - min_km) / (POPULAR_SEARCH_RINGS - 1) as f64;
    (0..POPULAR_SEARCH_RINGS)
        .map(|i| (min_km + step * i as f64) * 1000.0)
        .collect()
}

/// Drop repeated names, attach the distance and keep the window.
fn within_window(places: Vec<Place>, center: &Coordinates, min_km: f64, max_km: f64) -> Vec<Place> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|p| seen.insert(p.name.to_lowercase()))
        .map(|p| {
            let km = center.distance_km_to(&p.coordinates);
            p.with_distance_km(km)
        })
        .filter(|p| {
            p.distance_from_origin_km
                .is_some_and(|km| km >= min_km && km <= max_km)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheService;
    use crate::models::{Confidence, GeocodeResult, GeocodeSource};
    use crate::services::geocoding::Geocoder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct KochiGeocoder;

    #[async_trait]
    impl Geocoder for KochiGeocoder {
        async fn geocode(&self, query: &str) -> std::result::Result<Option<GeocodeResult>, ProviderError> {
            if query.eq_ignore_ascii_case("kochi") {
                Ok(Some(GeocodeResult {
                    name: "Kochi".to_string(),
                    coordinates: Coordinates::new(9.9312, 76.2673).unwrap(),
                    source: GeocodeSource::Nominatim,
                    confidence: Confidence::Medium,
                }))
            } else {
                Ok(None)
            }
        }

        fn name(&self) -> &'static str {
            "kochi-only"
        }
    }

    /// Every ring answers the same fixed list.
    struct RingPlaces {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PlacesProvider for RingPlaces {
        async fn places_near(
            &self,
            _center: &Coordinates,
            _radius_m: f64,
            _place_type: &str,
        ) -> std::result::Result<Vec<Place>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Timeout);
            }
            Ok(vec![
                // ~5 km, below the window
                Place::new("Fort Kochi", "", Coordinates::new(9.9658, 76.2421).unwrap()),
                Place::new("Athirappilly Waterfalls", "", Coordinates::new(10.2851, 76.5698).unwrap()),
                Place::new("Munnar", "", Coordinates::new(10.0889, 77.0595).unwrap()),
                Place::new("Vagamon", "", Coordinates::new(9.6863, 76.9052).unwrap()),
            ])
        }

        async fn photo_reference(
            &self,
            _name: &str,
            _near: &Coordinates,
        ) -> std::result::Result<Option<String>, ProviderError> {
            Ok(None)
        }

        fn photo_url(&self, reference: &str) -> String {
            reference.to_string()
        }
    }

    fn service(places: Arc<RingPlaces>) -> PopularDestinations {
        PopularDestinations::new(
            Arc::new(GeocodingService::new(vec![Arc::new(KochiGeocoder)])),
            places,
            Arc::new(MemoryCacheService::new(3600, 100)),
        )
    }

    #[test]
    fn radii_span_the_window() {
        let radii = ring_radii_m(30.0, 150.0);
        assert_eq!(radii.len(), POPULAR_SEARCH_RINGS);
        assert_eq!(radii[0], 30_000.0);
        assert_eq!(radii[4], 150_000.0);
        assert_eq!(radii[2], 90_000.0);
    }

    #[tokio::test]
    async fn results_are_deduplicated_filtered_and_cached() {
        let places = Arc::new(RingPlaces {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let popular = service(places.clone());

        let mut names: Vec<String> = popular
            .find("Kochi", 30.0, 150.0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Athirappilly Waterfalls", "Munnar", "Vagamon"]);
        assert_eq!(places.calls.load(Ordering::SeqCst), POPULAR_SEARCH_RINGS);

        let limited = popular.find("kochi ", 30.0, 150.0, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        // second call came from the cache
        assert_eq!(places.calls.load(Ordering::SeqCst), POPULAR_SEARCH_RINGS);
    }

    #[tokio::test]
    async fn unknown_origin_is_a_client_error() {
        let popular = service(Arc::new(RingPlaces {
            calls: AtomicUsize::new(0),
            fail: false,
        }));
        let err = popular.find("Atlantis", 30.0, 150.0, 4).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn all_rings_failing_is_a_provider_error() {
        let popular = service(Arc::new(RingPlaces {
            calls: AtomicUsize::new(0),
            fail: true,
        }));
        let err = popular.find("Kochi", 30.0, 150.0, 4).await.unwrap_err();
        assert!(matches!(err, AppError::Provider(ProviderError::Timeout)));
    }
}
