//! Shortest-column cell positioner.

use super::size_cache::CellSizeCache;

/// Column geometry for the positioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnConfig {
    /// Number of columns.
    pub column_count: u16,
    /// Width of each column.
    pub column_width: u16,
    /// Gap between columns and between stacked cells.
    pub spacer: u16,
}

/// Top-left corner of a positioned cell, relative to the grid content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    /// Column offset.
    pub left: u16,
    /// Row offset from the top of the content.
    pub top: u32,
}

/// Places cells, in index order, at the bottom of the shortest column.
#[derive(Debug, Clone)]
pub struct MasonryPositioner {
    config: ColumnConfig,
    column_heights: Vec<u32>,
}

impl MasonryPositioner {
    /// Creates a positioner with empty columns.
    #[must_use]
    pub fn new(config: ColumnConfig) -> Self {
        Self {
            config,
            column_heights: vec![0; usize::from(config.column_count)],
        }
    }

    /// Replaces the column geometry and empties every column.
    pub fn reset(&mut self, config: ColumnConfig) {
        self.config = config;
        self.column_heights.clear();
        self.column_heights
            .resize(usize::from(config.column_count), 0);
    }

    /// Current column geometry.
    #[must_use]
    pub const fn config(&self) -> ColumnConfig {
        self.config
    }

    /// Number of columns.
    #[must_use]
    pub const fn column_count(&self) -> u16 {
        self.config.column_count
    }

    /// Positions `index` using its cached height.
    ///
    /// Returns `None` when there are no columns to place into.
    pub fn position(&mut self, index: usize, cache: &CellSizeCache) -> Option<CellPosition> {
        let (column, top) = self
            .column_heights
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|&(column, height)| (height, column))?;

        let stride = self.config.column_width.saturating_add(self.config.spacer);
        let left = u16::try_from(column)
            .unwrap_or(u16::MAX)
            .saturating_mul(stride);

        self.column_heights[column] = top
            .saturating_add(u32::from(cache.height(index)))
            .saturating_add(u32::from(self.config.spacer));

        Some(CellPosition { left, top })
    }

    /// Bottom of the shortest column, 0 when there are no columns.
    #[must_use]
    pub fn shortest_column_height(&self) -> u32 {
        self.column_heights.iter().copied().min().unwrap_or(0)
    }

    /// Bottom of the tallest column, 0 when there are no columns.
    #[must_use]
    pub fn tallest_column_height(&self) -> u32 {
        self.column_heights.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layout::size_cache::CellSizeCacheParams;

    fn cache_with_heights(heights: &[u16]) -> CellSizeCache {
        let mut cache = CellSizeCache::new(CellSizeCacheParams {
            default_width: 10,
            default_height: 5,
            fixed_width: true,
        });
        for (index, height) in heights.iter().enumerate() {
            cache.set(index, 10, *height);
        }
        cache
    }

    fn config(column_count: u16) -> ColumnConfig {
        ColumnConfig {
            column_count,
            column_width: 10,
            spacer: 1,
        }
    }

    #[test]
    fn test_fills_shortest_column_first() {
        let cache = cache_with_heights(&[8, 3, 5, 2]);
        let mut positioner = MasonryPositioner::new(config(3));

        let positions: Vec<_> = (0..4)
            .map(|index| positioner.position(index, &cache))
            .collect();

        assert_eq!(positions[0], Some(CellPosition { left: 0, top: 0 }));
        assert_eq!(positions[1], Some(CellPosition { left: 11, top: 0 }));
        assert_eq!(positions[2], Some(CellPosition { left: 22, top: 0 }));
        // Column 1 ends at 3 + 1 spacer, the shortest.
        assert_eq!(positions[3], Some(CellPosition { left: 11, top: 4 }));
        assert_eq!(positioner.shortest_column_height(), 6);
        assert_eq!(positioner.tallest_column_height(), 9);
    }

    #[test]
    fn test_ties_prefer_leftmost_column() {
        let cache = cache_with_heights(&[4, 4, 4]);
        let mut positioner = MasonryPositioner::new(config(2));

        positioner.position(0, &cache);
        positioner.position(1, &cache);
        let third = positioner.position(2, &cache);

        assert_eq!(third, Some(CellPosition { left: 0, top: 5 }));
    }

    #[test]
    fn test_zero_columns_positions_nothing() {
        let cache = cache_with_heights(&[4]);
        let mut positioner = MasonryPositioner::new(config(0));
        assert_eq!(positioner.position(0, &cache), None);
        assert_eq!(positioner.shortest_column_height(), 0);
    }

    #[test]
    fn test_reset_empties_columns() {
        let cache = cache_with_heights(&[4, 4]);
        let mut positioner = MasonryPositioner::new(config(1));
        positioner.position(0, &cache);
        assert_eq!(positioner.tallest_column_height(), 5);

        positioner.reset(config(4));
        assert_eq!(positioner.column_count(), 4);
        assert_eq!(positioner.tallest_column_height(), 0);
        assert_eq!(
            positioner.position(1, &cache),
            Some(CellPosition { left: 0, top: 0 })
        );
    }
}
