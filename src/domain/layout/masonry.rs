//! Virtualized masonry viewport.
//!
//! Positions cells lazily, in index order, only as far as the viewport
//! needs, and answers which cells intersect the current scroll window.

use tracing::{debug, trace};

use super::infinite_loader::IndexRange;
use super::position_cache::{PositionCache, PositionedCell};
use super::positioner::MasonryPositioner;
use super::size_cache::{CellSize, CellSizeCache};

/// Default rows rendered above and below the viewport.
pub const DEFAULT_OVERSCAN: u16 = 8;

/// Scroll metrics reported after every layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollInfo {
    /// Viewport height.
    pub client_height: u16,
    /// Estimated content height.
    pub scroll_height: u32,
    /// Current scroll offset.
    pub scroll_top: u32,
}

impl ScrollInfo {
    /// Largest valid scroll offset.
    #[must_use]
    pub const fn max_scroll_top(&self) -> u32 {
        self.scroll_height.saturating_sub(self.client_height as u32)
    }

    /// Returns true when the viewport shows the end of the content.
    #[must_use]
    pub const fn at_bottom(&self) -> bool {
        self.scroll_top >= self.max_scroll_top()
    }
}

/// A cell selected for rendering, in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleCell {
    /// Cell index.
    pub index: usize,
    /// Column offset.
    pub left: u16,
    /// Row offset from the top of the content.
    pub top: u32,
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

/// Result of one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPass {
    /// Cells intersecting the overscanned viewport, by index.
    pub cells: Vec<VisibleCell>,
    /// Smallest and largest rendered index.
    pub rendered: Option<IndexRange>,
    /// Scroll metrics after clamping.
    pub scroll: ScrollInfo,
}

/// Virtualized masonry engine.
#[derive(Debug, Clone)]
pub struct MasonryLayout {
    positions: PositionCache,
    overscan: u16,
    scroll_top: u32,
}

impl MasonryLayout {
    /// Creates an engine scrolled to the top.
    #[must_use]
    pub fn new(overscan: u16) -> Self {
        Self {
            positions: PositionCache::new(),
            overscan,
            scroll_top: 0,
        }
    }

    /// Drops every computed position; cells are placed again on the next pass.
    ///
    /// The positioner must be reset alongside, otherwise its columns keep
    /// the old heights.
    pub fn recompute_cell_positions(&mut self) {
        debug!(
            positioned = self.positions.count(),
            "Recomputing cell positions"
        );
        self.positions = PositionCache::new();
    }

    /// Current scroll offset (clamped on the next pass).
    #[must_use]
    pub const fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    /// Sets the scroll offset.
    pub fn scroll_to(&mut self, top: u32) {
        self.scroll_top = top;
    }

    /// Moves the scroll offset by `delta` rows.
    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll_top = self.scroll_top.saturating_add_signed(delta);
    }

    /// Number of positioned cells.
    #[must_use]
    pub fn positioned_count(&self) -> usize {
        self.positions.count()
    }

    /// Position of `index`, if placed.
    #[must_use]
    pub fn position_of(&self, index: usize) -> Option<PositionedCell> {
        self.positions.get(index)
    }

    /// Runs one layout pass.
    ///
    /// Unpositioned cells are measured through `measure` (only when the cache
    /// has no entry for them) and placed until the shortest column reaches
    /// past the overscanned viewport bottom.
    pub fn layout(
        &mut self,
        cell_count: usize,
        viewport_width: u16,
        viewport_height: u16,
        cache: &mut CellSizeCache,
        positioner: &mut MasonryPositioner,
        mut measure: impl FnMut(usize) -> CellSize,
    ) -> LayoutPass {
        let overscan = u32::from(self.overscan);
        let window_bottom = self
            .scroll_top
            .saturating_add(u32::from(viewport_height))
            .saturating_add(overscan);

        while self.positions.count() < cell_count
            && positioner.shortest_column_height() < window_bottom
        {
            let index = self.positions.count();
            if !cache.has(index) {
                let size = measure(index);
                cache.set(index, size.width, size.height);
            }
            let Some(position) = positioner.position(index, cache) else {
                break;
            };
            self.positions
                .set_position(index, position.left, position.top, cache.height(index));
        }

        let estimated_columns =
            usize::from((viewport_width / cache.default_width().max(1)).max(1));
        let scroll_height = self.positions.estimate_total_height(
            cell_count,
            estimated_columns,
            cache.default_height(),
        );
        let max_scroll = scroll_height.saturating_sub(u32::from(viewport_height));
        if self.scroll_top > max_scroll {
            trace!(from = self.scroll_top, to = max_scroll, "Clamping scroll offset");
            self.scroll_top = max_scroll;
        }

        let query_top = self.scroll_top.saturating_sub(overscan);
        let query_height = u32::from(viewport_height)
            .saturating_add(overscan)
            .saturating_add(self.scroll_top - query_top);

        let cells: Vec<VisibleCell> = if viewport_height == 0 {
            Vec::new()
        } else {
            self.positions
                .range(query_top, query_height)
                .into_iter()
                .map(|cell| VisibleCell {
                    index: cell.index,
                    left: cell.left,
                    top: cell.top,
                    width: cache.width(cell.index),
                    height: cell.height,
                })
                .collect()
        };

        let rendered = match (cells.first(), cells.last()) {
            (Some(first), Some(last)) => Some(IndexRange::new(first.index, last.index)),
            _ => None,
        };

        LayoutPass {
            cells,
            rendered,
            scroll: ScrollInfo {
                client_height: viewport_height,
                scroll_height,
                scroll_top: self.scroll_top,
            },
        }
    }
}

impl Default for MasonryLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OVERSCAN)
    }
}
