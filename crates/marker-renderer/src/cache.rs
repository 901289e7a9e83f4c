//! Bounded in-memory caches shared across render passes.
//!
//! Each cache is a mutex-guarded LRU map with hit/miss counters. The lock is
//! held only for the lookup or the insert; building the value happens
//! outside of it, so two passes missing on the same key may both build and
//! the last insert wins.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::attributes::{AttributeKey, ResolvedAttributes};
use crate::compositor::{SubImageKey, SubImages};
use crate::config::MarkerCacheConfig;
use crate::ellipse::EllipseKey;
use crate::marker::VectorMarker;

/// Metric names reported by one cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheMetrics {
    pub hits: &'static str,
    pub misses: &'static str,
}

/// Snapshot of cache statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// A bounded LRU cache. A disabled cache always misses and never stores.
pub struct BoundedCache<K, V> {
    inner: Option<Mutex<LruCache<K, V>>>,
    capacity: usize,
    metrics: CacheMetrics,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize, enabled: bool, metrics: CacheMetrics) -> Self {
        let inner = match NonZeroUsize::new(capacity) {
            Some(cap) if enabled => Some(Mutex::new(LruCache::new(cap))),
            _ => None,
        };

        Self {
            inner,
            capacity,
            metrics,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a value, counting the hit or miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.inner.as_ref().and_then(|inner| {
            let mut cache = inner.lock().unwrap_or_else(|e| e.into_inner());
            cache.get(key).cloned()
        });

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(self.metrics.hits).increment(1);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(self.metrics.misses).increment(1);
        }
        found
    }

    /// Store a value, evicting the least recently used entry when full.
    pub fn insert(&self, key: K, value: V) {
        if let Some(inner) = &self.inner {
            let mut cache = inner.lock().unwrap_or_else(|e| e.into_inner());
            cache.put(key, value);
            self.inserts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .map(|inner| inner.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        if let Some(inner) = &self.inner {
            inner.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}

/// The caches of one rendering context, shared across concurrent passes.
pub struct MarkerCaches {
    pub attributes: BoundedCache<AttributeKey, ResolvedAttributes>,
    pub ellipses: BoundedCache<EllipseKey, Arc<VectorMarker>>,
    pub images: BoundedCache<SubImageKey, SubImages>,
    sampling_rate: u32,
}

impl MarkerCaches {
    pub fn new(config: &MarkerCacheConfig) -> Self {
        debug!(
            enabled = config.enabled,
            attr_cache_size = config.attr_cache_size,
            ellipse_cache_size = config.ellipse_cache_size,
            image_cache_size = config.image_cache_size,
            sampling_rate = config.sampling_rate,
            "Creating marker caches"
        );

        Self {
            attributes: BoundedCache::new(
                config.attr_cache_size,
                config.enabled,
                CacheMetrics {
                    hits: "marker_attr_cache_hits_total",
                    misses: "marker_attr_cache_misses_total",
                },
            ),
            ellipses: BoundedCache::new(
                config.ellipse_cache_size,
                config.enabled,
                CacheMetrics {
                    hits: "marker_ellipse_cache_hits_total",
                    misses: "marker_ellipse_cache_misses_total",
                },
            ),
            images: BoundedCache::new(
                config.image_cache_size,
                config.enabled,
                CacheMetrics {
                    hits: "marker_image_cache_hits_total",
                    misses: "marker_image_cache_misses_total",
                },
            ),
            sampling_rate: config.sampling_rate.max(1),
        }
    }

    /// Sub-pixel sampling rate per axis of the sub-image cache.
    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn clear(&self) {
        self.attributes.clear();
        self.ellipses.clear();
        self.images.clear();
    }
}

impl Default for MarkerCaches {
    fn default() -> Self {
        Self::new(&MarkerCacheConfig::default())
    }
}
