//! Detects unloaded rows near the rendered range and de-duplicates requests.

use std::collections::HashSet;

use tracing::{debug, trace};

/// Default number of rows beyond the rendered range that trigger a load.
pub const DEFAULT_THRESHOLD: usize = 15;
/// Default minimum number of rows per request.
pub const DEFAULT_MINIMUM_BATCH_SIZE: usize = 10;

/// Inclusive range of row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First index.
    pub start: usize,
    /// Last index, inclusive.
    pub stop: usize,
}

impl IndexRange {
    /// Creates a range, swapping bounds given in the wrong order.
    #[must_use]
    pub const fn new(start: usize, stop: usize) -> Self {
        if start <= stop {
            Self { start, stop }
        } else {
            Self {
                start: stop,
                stop: start,
            }
        }
    }

    /// Number of indices in the range.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stop - self.start + 1
    }

    /// Always false: a range holds at least one index.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if `index` lies within the range.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.stop
    }

    /// Returns true if the two ranges share an index.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.start <= other.stop && other.start <= self.stop
    }

    /// Iterates the indices of the range.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.start..=self.stop
    }
}

impl std::fmt::Display for IndexRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.stop)
    }
}

/// Tuning for [`InfiniteLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfiniteLoaderOptions {
    /// Rows beyond the rendered range that are checked for loading.
    pub threshold: usize,
    /// Requests are widened over further unloaded rows up to this size.
    pub minimum_batch_size: usize,
}

impl Default for InfiniteLoaderOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            minimum_batch_size: DEFAULT_MINIMUM_BATCH_SIZE,
        }
    }
}

/// Returns the contiguous unloaded ranges within `[start, stop]`.
///
/// The last range is extended forward and the first range backward over
/// further unloaded rows until it reaches `minimum_batch_size`. Ranges never
/// contain a loaded row.
pub fn scan_for_unloaded_ranges(
    is_row_loaded: impl Fn(usize) -> bool,
    minimum_batch_size: usize,
    row_count: usize,
    start: usize,
    stop: usize,
) -> Vec<IndexRange> {
    let mut ranges = Vec::new();
    let mut current: Option<IndexRange> = None;

    for index in start..=stop {
        if is_row_loaded(index) {
            if let Some(range) = current.take() {
                ranges.push(range);
            }
        } else {
            current = Some(match current {
                Some(range) => IndexRange::new(range.start, index),
                None => IndexRange::new(index, index),
            });
        }
    }

    if let Some(mut range) = current {
        let potential_stop = range
            .stop
            .max(range.start + minimum_batch_size.saturating_sub(1))
            .min(row_count.saturating_sub(1));
        for index in range.stop + 1..=potential_stop {
            if is_row_loaded(index) {
                break;
            }
            range.stop = index;
        }
        ranges.push(range);
    }

    if let Some(first) = ranges.first_mut() {
        while first.len() < minimum_batch_size && first.start > 0 {
            let index = first.start - 1;
            if is_row_loaded(index) {
                break;
            }
            first.start = index;
        }
    }

    ranges
}

/// Decides which row ranges must be requested for a rendered range.
#[derive(Debug, Default)]
pub struct InfiniteLoader {
    options: InfiniteLoaderOptions,
    in_flight: HashSet<IndexRange>,
    last_rendered: Option<IndexRange>,
    last_scan: Option<(IndexRange, Vec<IndexRange>)>,
}

impl InfiniteLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub fn new(options: InfiniteLoaderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Current options.
    #[must_use]
    pub const fn options(&self) -> InfiniteLoaderOptions {
        self.options
    }

    /// Records the rendered range and returns the ranges to request now.
    ///
    /// A range that is already in flight is not returned again, and a render
    /// reporting the same range with the same unloaded rows returns nothing.
    pub fn on_rows_rendered(
        &mut self,
        rendered: IndexRange,
        row_count: usize,
        is_row_loaded: impl Fn(usize) -> bool,
    ) -> Vec<IndexRange> {
        self.last_rendered = Some(rendered);
        if row_count == 0 {
            return Vec::new();
        }

        let start = rendered.start.saturating_sub(self.options.threshold);
        let stop = rendered
            .stop
            .saturating_add(self.options.threshold)
            .min(row_count - 1);
        if start > stop {
            return Vec::new();
        }

        let unloaded = scan_for_unloaded_ranges(
            is_row_loaded,
            self.options.minimum_batch_size,
            row_count,
            start,
            stop,
        );

        if self
            .last_scan
            .as_ref()
            .is_some_and(|(last_rendered, last_ranges)| {
                *last_rendered == rendered && *last_ranges == unloaded
            })
        {
            trace!(%rendered, "Unloaded ranges unchanged, skipping");
            return Vec::new();
        }
        self.last_scan = Some((rendered, unloaded.clone()));

        let requests: Vec<IndexRange> = unloaded
            .into_iter()
            .filter(|range| self.in_flight.insert(*range))
            .collect();

        if !requests.is_empty() {
            debug!(%rendered, count = requests.len(), "Requesting unloaded rows");
        }
        requests
    }

    /// Marks a request as resolved, successfully or not.
    ///
    /// Returns true if the range intersects the last rendered range, in which
    /// case the rendered child should be refreshed.
    pub fn complete(&mut self, range: IndexRange) -> bool {
        self.in_flight.remove(&range);
        self.last_rendered
            .is_some_and(|rendered| rendered.intersects(&range))
    }

    /// Returns true if `range` has been requested and not resolved.
    #[must_use]
    pub fn is_in_flight(&self, range: &IndexRange) -> bool {
        self.in_flight.contains(range)
    }

    /// Number of unresolved requests.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Forgets the last scan so the next render requests every unloaded
    /// range that is not in flight, even if nothing moved.
    pub fn reset_scan(&mut self) {
        self.last_scan = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_below(count: usize) -> impl Fn(usize) -> bool {
        move |index| index < count
    }

    #[test]
    fn test_scan_single_trailing_range() {
        let ranges = scan_for_unloaded_ranges(loaded_below(2), 10, 3, 0, 2);
        assert_eq!(ranges, vec![IndexRange::new(2, 2)]);
    }

    #[test]
    fn test_scan_extends_last_range_to_batch_size() {
        let ranges = scan_for_unloaded_ranges(loaded_below(5), 10, 100, 0, 7);
        assert_eq!(ranges, vec![IndexRange::new(5, 14)]);
    }

    #[test]
    fn test_scan_extension_stops_at_row_count() {
        let ranges = scan_for_unloaded_ranges(loaded_below(5), 10, 9, 0, 7);
        assert_eq!(ranges, vec![IndexRange::new(5, 8)]);
    }

    #[test]
    fn test_scan_extends_first_range_backwards() {
        // Rows 10..=19 loaded, everything before unloaded.
        let is_loaded = |index: usize| (10..20).contains(&index);
        let ranges = scan_for_unloaded_ranges(is_loaded, 10, 20, 8, 12);
        assert_eq!(ranges, vec![IndexRange::new(0, 9)]);
    }

    #[test]
    fn test_scan_never_includes_loaded_rows() {
        let is_loaded = |index: usize| index % 3 == 0;
        let ranges = scan_for_unloaded_ranges(is_loaded, 10, 30, 0, 20);
        for range in &ranges {
            assert!(range.indices().all(|index| !is_loaded(index)));
        }
        assert_eq!(ranges.first(), Some(&IndexRange::new(1, 2)));
    }

    #[test]
    fn test_scan_all_loaded() {
        assert!(scan_for_unloaded_ranges(loaded_below(50), 10, 50, 0, 49).is_empty());
    }

    #[test]
    fn test_requests_trailing_row_once_until_resolved() {
        let mut loader = InfiniteLoader::default();
        let rendered = IndexRange::new(0, 1);

        let first = loader.on_rows_rendered(rendered, 3, loaded_below(2));
        assert_eq!(first, vec![IndexRange::new(2, 2)]);

        // Re-render and scroll while in flight: nothing new.
        assert!(loader.on_rows_rendered(rendered, 3, loaded_below(2)).is_empty());
        assert!(
            loader
                .on_rows_rendered(IndexRange::new(1, 1), 3, loaded_below(2))
                .is_empty()
        );
        assert!(loader.is_in_flight(&IndexRange::new(2, 2)));

        // Resolves with the row now loaded: nothing further. Row 2 lies
        // outside the last rendered range, so no refresh is needed.
        assert!(!loader.complete(IndexRange::new(2, 2)));
        assert!(loader.on_rows_rendered(rendered, 3, loaded_below(3)).is_empty());
        assert_eq!(loader.in_flight_count(), 0);
    }

    #[test]
    fn test_failed_range_retried_after_scroll() {
        let mut loader = InfiniteLoader::default();
        let rendered = IndexRange::new(0, 4);

        assert_eq!(
            loader.on_rows_rendered(rendered, 20, loaded_below(5)),
            vec![IndexRange::new(5, 19)]
        );
        loader.complete(IndexRange::new(5, 19));

        // Same render after a failure: suppressed.
        assert!(loader.on_rows_rendered(rendered, 20, loaded_below(5)).is_empty());

        // A scroll changes the rendered range and retries.
        assert_eq!(
            loader.on_rows_rendered(IndexRange::new(1, 4), 20, loaded_below(5)),
            vec![IndexRange::new(5, 19)]
        );
    }

    #[test]
    fn test_reset_scan_retries_unmoved_failure() {
        let mut loader = InfiniteLoader::default();
        let rendered = IndexRange::new(0, 0);

        let first = loader.on_rows_rendered(rendered, 50, |_| false);
        assert_eq!(first, vec![IndexRange::new(0, 15)]);
        loader.complete(IndexRange::new(0, 15));
        assert!(loader.on_rows_rendered(rendered, 50, |_| false).is_empty());

        loader.reset_scan();
        assert_eq!(loader.on_rows_rendered(rendered, 50, |_| false), first);
        assert!(loader.on_rows_rendered(rendered, 50, |_| false).is_empty());
    }

    #[test]
    fn test_reset_scan_keeps_in_flight_ranges() {
        let mut loader = InfiniteLoader::default();
        let rendered = IndexRange::new(0, 0);
        loader.on_rows_rendered(rendered, 50, |_| false);

        loader.reset_scan();
        assert!(loader.on_rows_rendered(rendered, 50, |_| false).is_empty());
        assert_eq!(loader.in_flight_count(), 1);
    }

    #[test]
    fn test_no_requests_when_everything_is_loaded() {
        let mut loader = InfiniteLoader::default();
        for start in 0..10 {
            let rendered = IndexRange::new(start, start + 5);
            assert!(loader.on_rows_rendered(rendered, 16, loaded_below(16)).is_empty());
        }
    }

    #[test]
    fn test_zero_row_count_requests_nothing() {
        let mut loader = InfiniteLoader::default();
        assert!(
            loader
                .on_rows_rendered(IndexRange::new(0, 0), 0, |_| false)
                .is_empty()
        );
    }

    #[test]
    fn test_complete_outside_rendered_range() {
        let mut loader = InfiniteLoader::default();
        loader.on_rows_rendered(IndexRange::new(0, 3), 4, loaded_below(4));
        assert!(!loader.complete(IndexRange::new(40, 49)));
    }

    #[test]
    fn test_index_range_helpers() {
        let range = IndexRange::new(9, 5);
        assert_eq!(range, IndexRange::new(5, 9));
        assert_eq!(range.len(), 5);
        assert!(range.contains(5) && range.contains(9) && !range.contains(10));
        assert!(range.intersects(&IndexRange::new(9, 12)));
        assert!(!range.intersects(&IndexRange::new(10, 12)));
        assert_eq!(range.to_string(), "5..=9");
    }
}
