//! Image handling infrastructure.
//!
//! This module provides:
//! - Byte fetching over HTTP and from local files
//! - Memory caching with LRU eviction
//! - Asynchronous measuring pipeline

pub mod fetcher;
pub mod measurer;
pub mod memory_cache;

pub use fetcher::{ImageFetcher, ImageLocation};
pub use measurer::{ImageMeasuredEvent, ImageMeasurer, ImageMeasurerConfig, MeasuredImage};
pub use memory_cache::{CacheStats, CachedImage, MemoryImageCache};
