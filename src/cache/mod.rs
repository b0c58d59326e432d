mod memory;
mod redis;

pub use memory::MemoryCacheService;
pub use redis::RedisCacheService;

use crate::models::PlaceSuggestions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Memoizes suggestion results. Failures are logged, never surfaced: a
/// broken cache only costs a regeneration.
#[async_trait]
pub trait SuggestionCache: Send + Sync {
    async fn get_suggestions(&self, key: &str) -> Option<PlaceSuggestions>;
    async fn cache_suggestions(&self, key: &str, suggestions: &PlaceSuggestions);
    async fn get_stats(&self) -> CacheStats;
    async fn health_check(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Key for popular-destination lookups: origin plus distance window.
pub fn popular_cache_key(origin: &str, min_km: f64, max_km: f64) -> String {
    format!(
        "popular:{}-{}-{}",
        origin.trim().to_lowercase(),
        min_km,
        max_km
    )
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub connected: bool,
}

impl CacheStats {
    pub(crate) fn from_counts(hits: u64, misses: u64, connected: bool) -> Self {
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            connected,
        }
    }
}
