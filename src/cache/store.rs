//! Explicitly owned store for rendered feed fragments.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::FeedCacheKey;
use super::lock::{rw_read, rw_write};

/// A rendered fragment and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CachedFragment {
    pub html: Arc<str>,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl CachedFragment {
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Time-windowed, LRU-bounded fragment store.
///
/// Readers see the most recently stored snapshot for a key until it expires;
/// concurrent writers for the same key simply overwrite each other.
pub struct PageCache {
    enabled: bool,
    ttl: Duration,
    entries: RwLock<LruCache<FeedCacheKey, CachedFragment>>,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl(),
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &FeedCacheKey) -> Option<CachedFragment> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. Expired entries are dropped on the way.
    pub fn get_at(&self, key: &FeedCacheKey, now: Instant) -> Option<CachedFragment> {
        if !self.enabled {
            return None;
        }

        let fresh = {
            let entries = rw_read(&self.entries, "get");
            entries.peek(key).map(|entry| entry.is_fresh_at(now))
        };

        match fresh {
            Some(true) => {
                let hit = rw_write(&self.entries, "get.promote").get(key).cloned();
                if hit.is_some() {
                    counter!("yatube_page_cache_hit_total", "scope" => key.scope.as_str())
                        .increment(1);
                }
                hit
            }
            Some(false) => {
                let mut entries = rw_write(&self.entries, "get.expire");
                if entries.peek(key).is_some_and(|entry| !entry.is_fresh_at(now)) {
                    entries.pop(key);
                    counter!("yatube_page_cache_expired_total", "scope" => key.scope.as_str())
                        .increment(1);
                }
                drop(entries);
                counter!("yatube_page_cache_miss_total", "scope" => key.scope.as_str())
                    .increment(1);
                None
            }
            None => {
                counter!("yatube_page_cache_miss_total", "scope" => key.scope.as_str())
                    .increment(1);
                None
            }
        }
    }

    pub fn insert(&self, key: FeedCacheKey, html: impl Into<Arc<str>>) -> CachedFragment {
        self.insert_at(key, html, Instant::now())
    }

    /// Store `html` for `key` as of `now`, replacing any previous snapshot.
    pub fn insert_at(
        &self,
        key: FeedCacheKey,
        html: impl Into<Arc<str>>,
        now: Instant,
    ) -> CachedFragment {
        let expires_at = now.checked_add(self.ttl);
        let fragment = CachedFragment {
            html: html.into(),
            stored_at: now,
            expires_at: expires_at.unwrap_or(now),
        };
        if !self.enabled || expires_at.is_none() {
            return fragment;
        }

        let evicted = rw_write(&self.entries, "insert").push(key, fragment.clone());
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("yatube_page_cache_evict_total", "scope" => evicted_key.scope.as_str())
                .increment(1);
            debug!(
                target = "yatube::cache",
                page = evicted_key.page.get(),
                "evicted page cache entry"
            );
        }
        fragment
    }

    pub fn invalidate_all(&self) {
        rw_write(&self.entries, "invalidate_all").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
