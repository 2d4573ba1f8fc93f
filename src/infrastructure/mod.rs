//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Image feed adapters (Pixabay, local directory).
pub mod feed;
/// Image handling (fetching, caching, measuring).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigFile, ConfigSource, LogLevel};
pub use feed::{DirectoryFeed, PixabayClient};
pub use image::{
    CacheStats, ImageFetcher, ImageMeasuredEvent, ImageMeasurer, ImageMeasurerConfig,
    MeasuredImage, MemoryImageCache,
};
