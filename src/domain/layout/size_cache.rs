//! Per-index cell size cache.

use tracing::trace;

/// Measured size of one cell in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl CellSize {
    /// Creates a new size.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Construction parameters for [`CellSizeCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSizeCacheParams {
    /// Width reported for cells that were never measured.
    pub default_width: u16,
    /// Height reported for cells that were never measured.
    pub default_height: u16,
    /// When set, every cell reports `default_width` regardless of measurement.
    pub fixed_width: bool,
}

/// Maps cell index to its last measured size.
///
/// Entries are only ever added or overwritten; nothing is evicted for the
/// lifetime of the cache.
#[derive(Debug, Clone)]
pub struct CellSizeCache {
    params: CellSizeCacheParams,
    sizes: Vec<Option<CellSize>>,
    measured: usize,
}

impl CellSizeCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new(params: CellSizeCacheParams) -> Self {
        Self {
            params,
            sizes: Vec::new(),
            measured: 0,
        }
    }

    /// Width used for unmeasured cells.
    #[must_use]
    pub const fn default_width(&self) -> u16 {
        self.params.default_width
    }

    /// Height used for unmeasured cells.
    #[must_use]
    pub const fn default_height(&self) -> u16 {
        self.params.default_height
    }

    /// Returns true if `index` has been measured.
    #[must_use]
    pub fn has(&self, index: usize) -> bool {
        self.sizes.get(index).is_some_and(Option::is_some)
    }

    /// Width of `index`, or the default when fixed or unmeasured.
    #[must_use]
    pub fn width(&self, index: usize) -> u16 {
        if self.params.fixed_width {
            return self.params.default_width;
        }
        self.get(index)
            .map_or(self.params.default_width, |size| size.width)
    }

    /// Height of `index`, or the default when unmeasured.
    #[must_use]
    pub fn height(&self, index: usize) -> u16 {
        self.get(index)
            .map_or(self.params.default_height, |size| size.height)
    }

    /// Measured size of `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CellSize> {
        self.sizes.get(index).copied().flatten()
    }

    /// Records the size of `index`, returning the previous entry.
    pub fn set(&mut self, index: usize, width: u16, height: u16) -> Option<CellSize> {
        if index >= self.sizes.len() {
            self.sizes.resize(index + 1, None);
        }
        let previous = self.sizes[index].replace(CellSize::new(width, height));
        if previous.is_none() {
            self.measured += 1;
        }
        trace!(index, width, height, "Cell size recorded");
        previous
    }

    /// Number of measured cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.measured
    }

    /// Returns true when no cell has been measured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.measured == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(fixed_width: bool) -> CellSizeCache {
        CellSizeCache::new(CellSizeCacheParams {
            default_width: 28,
            default_height: 14,
            fixed_width,
        })
    }

    #[test]
    fn test_defaults_for_unmeasured_cells() {
        let cache = cache(true);
        assert!(!cache.has(3));
        assert_eq!(cache.width(3), 28);
        assert_eq!(cache.height(3), 14);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_and_overwrite() {
        let mut cache = cache(false);
        assert_eq!(cache.set(5, 20, 9), None);
        assert!(cache.has(5));
        assert!(!cache.has(4));
        assert_eq!(cache.height(5), 9);
        assert_eq!(cache.width(5), 20);

        assert_eq!(cache.set(5, 20, 11), Some(CellSize::new(20, 9)));
        assert_eq!(cache.height(5), 11);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fixed_width_ignores_measured_width() {
        let mut cache = cache(true);
        cache.set(0, 40, 10);
        assert_eq!(cache.width(0), 28);
        assert_eq!(cache.height(0), 10);
    }
}
