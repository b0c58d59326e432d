use crate::cache::{CacheStats, SuggestionCache};
use crate::clock::{Clock, SystemClock};
use crate::models::PlaceSuggestions;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Entry {
    value: PlaceSuggestions,
    stored_at: Duration,
}

/// In-memory cache backed by moka with bounded capacity. Entries are
/// immutable `Arc`s replaced on refresh; expiry is judged against the
/// injected clock so tests can step time.
pub struct MemoryCacheService {
    entries: Cache<String, Arc<Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheService {
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        Self::with_clock(ttl_seconds, max_capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_seconds: u64, max_capacity: u64, clock: Arc<dyn Clock>) -> Self {
        let ttl = Duration::from_secs(ttl_seconds);
        let entries = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();

        MemoryCacheService {
            entries,
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn miss(&self, key: &str) -> Option<PlaceSuggestions> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Memory cache miss: {}", key);
        None
    }
}

#[async_trait]
impl SuggestionCache for MemoryCacheService {
    async fn get_suggestions(&self, key: &str) -> Option<PlaceSuggestions> {
        let Some(entry) = self.entries.get(key).await else {
            return self.miss(key);
        };

        if self.clock.now().saturating_sub(entry.stored_at) >= self.ttl {
            self.entries.invalidate(key).await;
            return self.miss(key);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Memory cache hit: {}", key);
        Some(entry.value.clone())
    }

    async fn cache_suggestions(&self, key: &str, suggestions: &PlaceSuggestions) {
        let entry = Arc::new(Entry {
            value: suggestions.clone(),
            stored_at: self.clock.now(),
        });
        self.entries.insert(key.to_string(), entry).await;
        tracing::debug!("Memory cached suggestions: {}", key);
    }

    async fn get_stats(&self) -> CacheStats {
        CacheStats::from_counts(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            true,
        )
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Coordinates, Place};

    fn suggestions(name: &str) -> PlaceSuggestions {
        PlaceSuggestions {
            primary: vec![Place::new(name, "", Coordinates::new(10.0, 76.5).unwrap())],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cache_miss() {
        let cache = MemoryCacheService::new(3600, 100);
        assert!(cache.get_suggestions("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn stored_value_is_returned() {
        let cache = MemoryCacheService::new(3600, 100);
        cache.cache_suggestions("key1", &suggestions("Munnar")).await;

        let cached = cache.get_suggestions("key1").await.unwrap();
        assert_eq!(cached.primary[0].name, "Munnar");
    }

    #[tokio::test]
    async fn stats_tracking() {
        let cache = MemoryCacheService::new(3600, 100);
        cache.cache_suggestions("key1", &suggestions("Munnar")).await;

        // 1 miss
        cache.get_suggestions("missing").await;
        // 2 hits
        cache.get_suggestions("key1").await;
        cache.get_suggestions("key1").await;

        let stats = cache.get_stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 66.666).abs() < 1.0);
    }

    #[tokio::test]
    async fn entries_expire_by_injected_clock() {
        let clock = Arc::new(ManualClock::new());
        let cache = MemoryCacheService::with_clock(60, 100, clock.clone());
        cache.cache_suggestions("key1", &suggestions("Munnar")).await;

        clock.advance(Duration::from_secs(59));
        assert!(cache.get_suggestions("key1").await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get_suggestions("key1").await.is_none());
    }

    #[tokio::test]
    async fn refresh_replaces_entry() {
        let clock = Arc::new(ManualClock::new());
        let cache = MemoryCacheService::with_clock(60, 100, clock.clone());
        cache.cache_suggestions("key1", &suggestions("Munnar")).await;
        clock.advance(Duration::from_secs(50));
        cache.cache_suggestions("key1", &suggestions("Thekkady")).await;
        clock.advance(Duration::from_secs(50));

        let cached = cache.get_suggestions("key1").await.unwrap();
        assert_eq!(cached.primary[0].name, "Thekkady");
    }

    #[tokio::test]
    async fn backend_name_is_memory() {
        let cache = MemoryCacheService::new(3600, 100);
        assert_eq!(cache.backend_name(), "memory");
        assert!(cache.health_check().await);
    }
}
