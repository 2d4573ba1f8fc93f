//! In-memory LRU image cache implementation.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{ImageDimensions, ImageId};

/// Default maximum number of images to cache in memory.
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// A decoded image together with its natural size before downsizing.
#[derive(Debug, Clone)]
pub struct CachedImage {
    /// Decoded, possibly downsized image.
    pub image: Arc<image::DynamicImage>,
    /// Size of the source image.
    pub natural: ImageDimensions,
}

/// In-memory LRU cache for decoded images.
pub struct MemoryImageCache {
    cache: Mutex<LruCache<ImageId, CachedImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl MemoryImageCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up an image, promoting it in the LRU.
    pub fn get(&self, id: &ImageId) -> Option<CachedImage> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(id = %id, "Memory cache hit");
            Some(entry.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(id = %id, "Memory cache miss");
            None
        }
    }

    /// Stores an image, evicting the least recently used one when full.
    pub fn put(&self, id: ImageId, entry: CachedImage) {
        debug!(id = %id, natural = %entry.natural, "Storing image in memory cache");
        if let Some((evicted, _)) = self.cache.lock().push(id.clone(), entry)
            && evicted != id
        {
            trace!(id = %evicted, "Evicted image from memory cache");
        }
    }

    /// Number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(width: u32, height: u32) -> CachedImage {
        CachedImage {
            image: Arc::new(image::DynamicImage::new_rgb8(width, height)),
            natural: ImageDimensions::new(width, height),
        }
    }

    #[test]
    fn test_put_and_get() {
        let cache = MemoryImageCache::new(10);
        let id = ImageId::new("a");
        cache.put(id.clone(), entry(4, 2));

        let cached = cache.get(&id).unwrap();
        assert_eq!(cached.natural, ImageDimensions::new(4, 2));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = MemoryImageCache::new(2);
        cache.put(ImageId::new("a"), entry(1, 1));
        cache.put(ImageId::new("b"), entry(1, 1));
        cache.get(&ImageId::new("a"));
        cache.put(ImageId::new("c"), entry(1, 1));

        assert!(cache.get(&ImageId::new("a")).is_some());
        assert!(cache.get(&ImageId::new("b")).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_stats() {
        let cache = MemoryImageCache::new(4);
        cache.put(ImageId::new("a"), entry(1, 1));
        cache.get(&ImageId::new("a"));
        cache.get(&ImageId::new("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
        assert!(stats.to_string().contains("1 images"));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = MemoryImageCache::new(0);
        cache.put(ImageId::new("a"), entry(1, 1));
        assert!(!cache.is_empty());
    }
}
