//! Positions of already-placed cells with vertical range lookup.

use std::collections::BTreeMap;

/// A positioned cell in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedCell {
    /// Cell index.
    pub index: usize,
    /// Column offset.
    pub left: u16,
    /// Row offset from the top of the content.
    pub top: u32,
    /// Height in rows.
    pub height: u16,
}

impl PositionedCell {
    /// First row below the cell.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height as u32)
    }
}

/// Stores cell positions in index order.
///
/// Cells are bucketed by their top row so a viewport query only walks the
/// cells whose top lies within one maximum cell height of the viewport.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    cells: Vec<PositionedCell>,
    by_top: BTreeMap<u32, Vec<usize>>,
    max_cell_height: u16,
    tallest_bottom: u32,
}

impl PositionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positioned cells. Cells `0..count` are positioned.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cells.len()
    }

    /// Records the position of the next cell.
    ///
    /// `index` must equal [`Self::count`]; out of order positions are ignored.
    pub fn set_position(&mut self, index: usize, left: u16, top: u32, height: u16) {
        debug_assert_eq!(index, self.cells.len(), "cells must be positioned in index order");
        if index != self.cells.len() {
            return;
        }
        let cell = PositionedCell {
            index,
            left,
            top,
            height,
        };
        self.by_top.entry(top).or_default().push(index);
        self.max_cell_height = self.max_cell_height.max(height);
        self.tallest_bottom = self.tallest_bottom.max(cell.bottom());
        self.cells.push(cell);
    }

    /// Position of `index`, if placed.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PositionedCell> {
        self.cells.get(index).copied()
    }

    /// Bottom of the lowest placed cell.
    #[must_use]
    pub const fn tallest_column_size(&self) -> u32 {
        self.tallest_bottom
    }

    /// Cells intersecting rows `[scroll_top, scroll_top + height)`, by index.
    #[must_use]
    pub fn range(&self, scroll_top: u32, height: u32) -> Vec<PositionedCell> {
        if height == 0 {
            return Vec::new();
        }
        let end = scroll_top.saturating_add(height);
        let start = scroll_top.saturating_sub(u32::from(self.max_cell_height));

        let mut cells: Vec<PositionedCell> = self
            .by_top
            .range(start..end)
            .flat_map(|(_, indices)| indices.iter().map(|&index| self.cells[index]))
            .filter(|cell| cell.bottom() > scroll_top)
            .collect();
        cells.sort_unstable_by_key(|cell| cell.index);
        cells
    }

    /// Estimated content height when `cell_count` cells exist in total.
    #[must_use]
    pub fn estimate_total_height(
        &self,
        cell_count: usize,
        column_count: usize,
        default_cell_height: u16,
    ) -> u32 {
        let unpositioned = cell_count.saturating_sub(self.count());
        let rows = unpositioned.div_ceil(column_count.max(1));
        let rows = u32::try_from(rows).unwrap_or(u32::MAX);
        self.tallest_bottom
            .saturating_add(rows.saturating_mul(u32::from(default_cell_height)))
    }
}
