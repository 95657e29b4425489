//! Decision caching for repeated identical requests.
//!
//! Caches bare decisions keyed on the request attribute bag. Only settled
//! decisions are cached: PERMIT always, DENY when configured. Indeterminate
//! and inapplicable outcomes may reflect a transient failure and are never
//! pinned for the TTL. Outcomes that carry obligation or advice handlers
//! are never cached either: handlers are closures tied to the evaluation
//! that produced them.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::context::Request;
use crate::decision::{Decision, Outcome};

/// Configuration for the decision cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_entries: usize,
    /// Time-to-live for cached decisions.
    pub ttl: Duration,
    /// Whether to cache deny decisions.
    pub cache_denies: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(300), // 5 minutes
            cache_denies: false,
        }
    }
}

impl CacheConfig {
    /// Create a production cache configuration.
    pub fn production() -> Self {
        Self {
            max_entries: 50_000,
            ttl: Duration::from_secs(60), // 1 minute
            cache_denies: false,
        }
    }

    /// Create a development cache configuration.
    pub fn development() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(30),
            cache_denies: true,
        }
    }

    /// Disable caching.
    pub fn disabled() -> Self {
        Self {
            max_entries: 0,
            ttl: Duration::ZERO,
            cache_denies: false,
        }
    }
}

/// Cache key derived from a request's attribute bag.
///
/// Attribute pairs are hashed in sorted-name order so that two requests
/// with the same attributes in different insertion order share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    request_hash: u64,
}

impl CacheKey {
    fn from_request(request: &Request) -> Self {
        let mut pairs: Vec<_> = request.attributes().iter().collect();
        pairs.sort_by_key(|(name, _)| name.as_str());

        let mut hasher = DefaultHasher::new();
        for (name, value) in pairs {
            name.hash(&mut hasher);
            // serde_json::Value is not Hash; its canonical text is.
            value.to_string().hash(&mut hasher);
        }
        Self {
            request_hash: hasher.finish(),
        }
    }
}

/// Cached decision entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    decision: Decision,
    created_at: Instant,
}

impl CacheEntry {
    fn new(decision: Decision) -> Self {
        Self {
            decision,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub size: usize,
    /// Number of evictions due to capacity or expiry.
    pub evictions: u64,
}

/// Decision cache keyed on request attribute bags.
#[derive(Debug)]
pub struct DecisionCache {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DecisionCache {
    /// Create a new decision cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Get a cached decision for the given request.
    pub fn get(&self, request: &Request) -> Option<Decision> {
        if self.config.max_entries == 0 {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let key = CacheKey::from_request(request);
        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&key) {
                if !entry.is_expired(self.config.ttl) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.decision);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert a decision for the given request.
    pub fn insert(&self, request: &Request, decision: Decision) {
        if self.config.max_entries == 0 {
            return;
        }

        let key = CacheKey::from_request(request);
        let entry = CacheEntry::new(decision);

        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        // Evict expired entries if we're at capacity
        if entries.len() >= self.config.max_entries {
            self.evict_expired(&mut entries);
        }

        // If still at capacity, evict oldest entries
        while entries.len() >= self.config.max_entries {
            if let Some(oldest_key) = Self::find_oldest(&entries) {
                entries.remove(&oldest_key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            } else {
                break;
            }
        }

        entries.insert(key, entry);
    }

    /// Check if an outcome may be cached.
    ///
    /// Only settled decisions are replayable: PERMIT always, DENY when
    /// configured. Indeterminate and inapplicable outcomes are never
    /// cached, and neither are outcomes carrying obligation or advice
    /// handlers.
    pub fn should_cache(&self, outcome: &Outcome) -> bool {
        if self.config.max_entries == 0 {
            return false;
        }
        if !outcome.1.is_empty() || !outcome.2.is_empty() {
            return false;
        }
        match outcome.0 {
            Decision::Permit => true,
            Decision::Deny => self.config.cache_denies,
            _ => false,
        }
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let size = self.entries.read().map(|e| e.len()).unwrap_or(0);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn evict_expired(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        let ttl = self.config.ttl;
        let before = entries.len();
        entries.retain(|_, v| !v.is_expired(ttl));
        let evicted = before - entries.len();
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    fn find_oldest(entries: &HashMap<CacheKey, CacheEntry>) -> Option<CacheKey> {
        entries
            .iter()
            .min_by_key(|(_, v)| v.created_at)
            .map(|(k, _)| k.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::bare;

    fn request(action: &str) -> Request {
        Request::new()
            .with_attribute("action", action)
            .with_attribute("resource", "report")
    }

    #[test]
    fn test_cache_hit_miss() {
        let cache = DecisionCache::new(CacheConfig::default());
        let req = request("read");

        assert!(cache.get(&req).is_none());

        cache.insert(&req, Decision::Permit);
        assert_eq!(cache.get(&req), Some(Decision::Permit));
    }

    #[test]
    fn test_key_ignores_insertion_order() {
        let cache = DecisionCache::new(CacheConfig::default());
        let a = Request::new()
            .with_attribute("action", "read")
            .with_attribute("resource", "report");
        let b = Request::new()
            .with_attribute("resource", "report")
            .with_attribute("action", "read");

        cache.insert(&a, Decision::Permit);
        assert_eq!(cache.get(&b), Some(Decision::Permit));
    }

    #[test]
    fn test_cache_stats() {
        let cache = DecisionCache::new(CacheConfig::default());
        let req = request("read");

        cache.get(&req); // miss
        cache.insert(&req, Decision::Permit);
        cache.get(&req); // hit
        cache.get(&req); // hit

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_cache_disabled() {
        let cache = DecisionCache::new(CacheConfig::disabled());
        let req = request("read");

        cache.insert(&req, Decision::Permit);
        assert!(cache.get(&req).is_none());
        assert!(!cache.should_cache(&bare(Decision::Permit)));
    }

    #[test]
    fn test_should_cache_gates() {
        let cache = DecisionCache::new(CacheConfig {
            cache_denies: false,
            ..Default::default()
        });

        assert!(cache.should_cache(&bare(Decision::Permit)));
        assert!(!cache.should_cache(&bare(Decision::Deny)));

        // Unsettled decisions may reflect a transient failure and are
        // never pinned for the TTL.
        assert!(!cache.should_cache(&bare(Decision::NotApplicable)));
        assert!(!cache.should_cache(&bare(Decision::Indeterminate)));
        assert!(!cache.should_cache(&bare(Decision::IndeterminatePermit)));
        assert!(!cache.should_cache(&bare(Decision::IndeterminateDeny)));
        assert!(!cache.should_cache(&bare(Decision::IndeterminateDenyOrPermit)));

        // Outcomes with handlers are never cached.
        let with_obligation: Outcome = (
            Decision::Permit,
            vec![std::sync::Arc::new(|_: &crate::context::Context| {})],
            vec![],
        );
        assert!(!cache.should_cache(&with_obligation));

        let caching_denies = DecisionCache::new(CacheConfig {
            cache_denies: true,
            ..Default::default()
        });
        assert!(caching_denies.should_cache(&bare(Decision::Deny)));
    }

    #[test]
    fn test_cache_clear() {
        let cache = DecisionCache::new(CacheConfig::default());
        let req = request("read");

        cache.insert(&req, Decision::Permit);
        assert!(cache.get(&req).is_some());

        cache.clear();
        assert!(cache.get(&req).is_none());
    }

    #[test]
    fn test_capacity_eviction() {
        let cache = DecisionCache::new(CacheConfig {
            max_entries: 2,
            ..Default::default()
        });

        cache.insert(&request("a"), Decision::Permit);
        cache.insert(&request("b"), Decision::Permit);
        cache.insert(&request("c"), Decision::Permit);

        let stats = cache.stats();
        assert!(stats.size <= 2);
        assert!(stats.evictions >= 1);
    }
}
