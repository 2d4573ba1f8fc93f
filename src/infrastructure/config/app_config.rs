//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::services::DEFAULT_MAX_ROWS;
use crate::domain::layout::{
    CardMetrics, DEFAULT_CARD_HEIGHT, DEFAULT_CARD_WIDTH, DEFAULT_GUTTER,
    DEFAULT_MINIMUM_BATCH_SIZE, DEFAULT_OVERSCAN, DEFAULT_THRESHOLD, InfiniteLoaderOptions,
};
use crate::infrastructure::image::ImageMeasurerConfig;

const APP_NAME: &str = "pixwall";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from `config.toml` merged with CLI arguments.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Search query given on the command line.
    #[serde(skip)]
    pub query: Option<String>,

    /// Local directory to browse instead of Pixabay.
    #[serde(skip)]
    pub directory: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Enable mouse support.
    #[serde(default = "default_true")]
    pub mouse: bool,

    /// Pixabay API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Grid layout configuration.
    #[serde(default)]
    pub grid: GridConfig,

    /// Feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Image loading configuration.
    #[serde(default)]
    pub images: ImagesConfig,
}

/// Grid layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Card and column width in terminal columns.
    #[serde(default = "default_card_width")]
    pub card_width: u16,

    /// Card height used until an image is measured.
    #[serde(default = "default_card_height")]
    pub card_height: u16,

    /// Space between columns and between stacked cards.
    #[serde(default = "default_gutter")]
    pub gutter: u16,

    /// Rows rendered above and below the viewport.
    #[serde(default = "default_overscan")]
    pub overscan: u16,

    /// Rows beyond the rendered range checked for loading.
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Minimum number of rows per load request.
    #[serde(default = "default_minimum_batch_size")]
    pub minimum_batch_size: usize,
}

impl GridConfig {
    /// Card geometry for the grid.
    #[must_use]
    pub fn card_metrics(&self) -> CardMetrics {
        CardMetrics::new(self.card_width, self.card_height, self.gutter)
    }

    /// Infinite loader tuning.
    #[must_use]
    pub fn loader_options(&self) -> InfiniteLoaderOptions {
        InfiniteLoaderOptions {
            threshold: self.threshold,
            minimum_batch_size: self.minimum_batch_size.max(1),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            card_width: DEFAULT_CARD_WIDTH,
            card_height: DEFAULT_CARD_HEIGHT,
            gutter: DEFAULT_GUTTER,
            overscan: DEFAULT_OVERSCAN,
            threshold: DEFAULT_THRESHOLD,
            minimum_batch_size: DEFAULT_MINIMUM_BATCH_SIZE,
        }
    }
}

/// Feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Results per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Upper bound on rows ever shown.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Ask the feed to filter unsafe results.
    #[serde(default = "default_true")]
    pub safesearch: bool,

    /// Query used when none is given on the command line.
    #[serde(default)]
    pub default_query: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            max_rows: default_max_rows(),
            safesearch: true,
            default_query: String::new(),
        }
    }
}

/// Image loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Maximum decoded images kept in memory.
    #[serde(default = "default_memory_cache_size")]
    pub memory_cache_size: usize,

    /// Maximum concurrent downloads.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Decoded images wider than this are downsized.
    #[serde(default = "default_max_decoded_width")]
    pub max_decoded_width: u32,
}

impl ImagesConfig {
    /// Measurer settings.
    #[must_use]
    pub fn measurer_config(&self) -> ImageMeasurerConfig {
        ImageMeasurerConfig {
            memory_cache_size: self.memory_cache_size,
            max_concurrent_downloads: self.max_concurrent_downloads,
            max_decoded_width: self.max_decoded_width,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: default_memory_cache_size(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            timeout_secs: default_timeout_secs(),
            max_decoded_width: default_max_decoded_width(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_card_width() -> u16 {
    DEFAULT_CARD_WIDTH
}

const fn default_card_height() -> u16 {
    DEFAULT_CARD_HEIGHT
}

const fn default_gutter() -> u16 {
    DEFAULT_GUTTER
}

const fn default_overscan() -> u16 {
    DEFAULT_OVERSCAN
}

const fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

const fn default_minimum_batch_size() -> usize {
    DEFAULT_MINIMUM_BATCH_SIZE
}

const fn default_per_page() -> u32 {
    50
}

const fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

const fn default_memory_cache_size() -> usize {
    64
}

const fn default_max_concurrent_downloads() -> usize {
    4
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_decoded_width() -> u32 {
    640
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(query) = args.query {
            self.query = Some(query);
        }
        if let Some(directory) = args.dir {
            self.directory = Some(directory);
        }
        if let Some(api_key) = args.api_key {
            self.api_key = Some(api_key);
        }
        if let Some(mouse) = args.mouse {
            self.mouse = mouse;
        }
        if let Some(per_page) = args.per_page {
            self.feed.per_page = per_page;
        }
        if let Some(card_width) = args.card_width {
            self.grid.card_width = card_width;
        }
        if let Some(card_height) = args.card_height {
            self.grid.card_height = card_height;
        }
    }

    /// Query to search for: the CLI query, else the configured default.
    #[must_use]
    pub fn effective_query(&self) -> String {
        self.query
            .clone()
            .unwrap_or_else(|| self.feed.default_query.clone())
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("pixwall.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            query: None,
            directory: None,
            log_level: LogLevel::Info,
            mouse: true,
            api_key: None,
            grid: GridConfig::default(),
            feed: FeedConfig::default(),
            images: ImagesConfig::default(),
        }
    }
}
