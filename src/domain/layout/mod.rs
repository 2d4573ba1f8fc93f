//! Headless masonry layout engine.
//!
//! - [`CellSizeCache`] remembers measured cell sizes by index
//! - [`MasonryPositioner`] packs cells into the shortest column
//! - [`MasonryLayout`] virtualizes the viewport over a [`PositionCache`]
//! - [`InfiniteLoader`] turns rendered ranges into row requests

pub mod card;
pub mod infinite_loader;
pub mod masonry;
pub mod position_cache;
pub mod positioner;
pub mod size_cache;

pub use card::{CardMetrics, DEFAULT_CARD_HEIGHT, DEFAULT_CARD_WIDTH, DEFAULT_GUTTER};
pub use infinite_loader::{
    DEFAULT_MINIMUM_BATCH_SIZE, DEFAULT_THRESHOLD, IndexRange, InfiniteLoader,
    InfiniteLoaderOptions, scan_for_unloaded_ranges,
};
pub use masonry::{DEFAULT_OVERSCAN, LayoutPass, MasonryLayout, ScrollInfo, VisibleCell};
pub use position_cache::{PositionCache, PositionedCell};
pub use positioner::{CellPosition, ColumnConfig, MasonryPositioner};
pub use size_cache::{CellSize, CellSizeCache, CellSizeCacheParams};
