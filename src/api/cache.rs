//! Time-boxed cache for GET responses.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use lru::LruCache;

use crate::api::config::CacheConfig;
use crate::clock::Clock;

/// Cache entry with an absolute expiry.
#[derive(Clone, Debug)]
struct CacheEntry {
    body: serde_json::Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Build the cache key for a request.
///
/// Query parameters are sorted so `?a=1&b=2` and `?b=2&a=1` share an entry.
#[must_use]
pub fn cache_key(method: &str, url: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    sorted.sort();
    format!("{}:{url}?{}", method.to_ascii_uppercase(), sorted.join("&"))
}

/// Response cache keyed by method, URL and params.
///
/// Lookups use `peek`, so recency order is insertion order and the oldest
/// entry is the one evicted when the cap is reached.
pub struct ResponseCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<LruCache<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    epoch: AtomicU64,
}

impl ResponseCache {
    /// Create a cache reading time from `clock`.
    #[must_use]
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            clock,
            entries: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached body for `key`, if present and fresh.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now();
        let mut entries = self.entries();
        let lookup = entries
            .peek(key)
            .map(|entry| (entry.is_expired(now), entry.body.clone()));
        let fresh = match lookup {
            Some((false, body)) => Some(body),
            Some((true, _)) => {
                let _ = entries.pop(key);
                None
            }
            None => None,
        };
        drop(entries);

        if fresh.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    /// Store a body under `key`.
    pub fn set(&self, key: &str, body: serde_json::Value) {
        if !self.config.enabled {
            return;
        }
        self.store(&mut self.entries(), key, body);
    }

    /// Store a body under `key` unless the cache was cleared since `epoch`.
    ///
    /// Returns whether the body was stored.
    pub fn set_if_epoch(&self, key: &str, body: serde_json::Value, epoch: u64) -> bool {
        if !self.config.enabled {
            return false;
        }
        let mut entries = self.entries();
        if self.epoch() != epoch {
            return false;
        }
        self.store(&mut entries, key, body);
        true
    }

    fn store(&self, entries: &mut LruCache<String, CacheEntry>, key: &str, body: serde_json::Value) {
        let now = self.clock.now();
        if entries.len() >= entries.cap().get() {
            Self::cleanup_expired_in(entries, now);
        }
        let _ = entries.push(
            key.to_string(),
            CacheEntry {
                body,
                expires_at: now + self.config.ttl,
            },
        );
    }

    /// Number of [`ResponseCache::clear`] calls so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    /// Remove expired entries.
    pub fn cleanup_expired(&self) {
        let now = self.clock.now();
        Self::cleanup_expired_in(&mut self.entries(), now);
    }

    fn cleanup_expired_in(entries: &mut LruCache<String, CacheEntry>, now: Instant) {
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            let _ = entries.pop(&key);
        }
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    /// Number of stored entries, fresh or not.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed or found an expired entry.
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;

    fn cache_with(ttl_secs: u64, max_entries: usize) -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = CacheConfig {
            enabled: true,
            ttl: Duration::from_secs(ttl_secs),
            max_entries,
        };
        (ResponseCache::new(config, clock.clone()), clock)
    }

    #[test]
    fn ttl_boundary() {
        let (cache, clock) = cache_with(60, 10);
        cache.set("GET:/robots/?", json!([{"id": 1}]));

        clock.advance(Duration::from_secs(60) - Duration::from_millis(1));
        assert_eq!(cache.get("GET:/robots/?"), Some(json!([{"id": 1}])));

        clock.advance(Duration::from_millis(2));
        assert_eq!(cache.get("GET:/robots/?"), None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn evicts_oldest_first() {
        let (cache, _clock) = cache_with(60, 2);
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        // Reads must not refresh recency.
        assert!(cache.get("a").is_some());
        cache.set("c", json!(3));

        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn expired_entries_go_before_fresh_ones() {
        let (cache, clock) = cache_with(10, 2);
        cache.set("old", json!("old"));
        clock.advance(Duration::from_secs(8));
        cache.set("young", json!("young"));
        clock.advance(Duration::from_secs(3));

        cache.set("new", json!("new"));
        assert_eq!(cache.get("young"), Some(json!("young")));
        assert_eq!(cache.get("new"), Some(json!("new")));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::new(CacheConfig::disabled(), clock);
        cache.set("k", json!(true));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn body_fetched_before_clear_is_not_stored() {
        let (cache, _clock) = cache_with(60, 4);
        let epoch = cache.epoch();
        cache.clear();
        assert_ne!(cache.epoch(), epoch);

        assert!(!cache.set_if_epoch("GET:/robots/?", json!([{"id": 1}]), epoch));
        assert!(cache.get("GET:/robots/?").is_none());
        assert!(cache.set_if_epoch("GET:/robots/?", json!([]), cache.epoch()));
        assert_eq!(cache.get("GET:/robots/?"), Some(json!([])));
    }

    #[test]
    fn key_ignores_param_order() {
        let a = cache_key(
            "get",
            "http://h/api/robot-pdfs/",
            &[("robot_id", "1".to_string()), ("is_active", "true".to_string())],
        );
        let b = cache_key(
            "GET",
            "http://h/api/robot-pdfs/",
            &[("is_active", "true".to_string()), ("robot_id", "1".to_string())],
        );
        assert_eq!(a, b);
        assert_ne!(a, cache_key("GET", "http://h/api/robot-pdfs/", &[]));
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let (cache, _clock) = cache_with(60, 4);
        assert!(cache.get("missing").is_none());
        cache.set("k", json!(1));
        assert!(cache.get("k").is_some());
        cache.clear();
        assert!(cache.get("k").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 0);
    }
}
