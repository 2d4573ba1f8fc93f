//! Pagination over an image feed, exposed to the grid as a row loader.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::domain::entities::{FeedPage, ImageItem};
use crate::domain::errors::FeedError;
use crate::domain::layout::IndexRange;
use crate::domain::ports::{ImageFeedPort, RowLoader};

/// Default number of rows the paginator will ever expose.
pub const DEFAULT_MAX_ROWS: usize = 500;

#[derive(Debug, Default)]
struct PaginatorState {
    /// Contiguous images of pages `1..next_page`.
    images: Vec<ImageItem>,
    /// Pages that arrived ahead of a missing earlier page.
    parked: BTreeMap<u32, Vec<ImageItem>>,
    next_page: u32,
    in_flight: HashSet<u32>,
    total_hits: Option<usize>,
    revision: u64,
}

impl PaginatorState {
    fn known_page(&self, page: u32) -> bool {
        page < self.next_page || self.parked.contains_key(&page) || self.in_flight.contains(&page)
    }

    fn promote_parked(&mut self) {
        while let Some(items) = self.parked.remove(&self.next_page) {
            self.images.extend(items);
            self.next_page += 1;
            self.revision += 1;
        }
    }
}

/// Loads feed pages on demand and keeps the ordered list of fetched images.
///
/// Pages may resolve out of order; only the contiguous prefix starting at
/// page 1 is exposed, so image indices never shift.
pub struct FeedPaginator {
    feed: Arc<dyn ImageFeedPort>,
    query: String,
    per_page: u32,
    max_rows: usize,
    state: RwLock<PaginatorState>,
}

impl std::fmt::Debug for FeedPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPaginator")
            .field("feed", &self.feed.name())
            .field("query", &self.query)
            .field("per_page", &self.per_page)
            .field("max_rows", &self.max_rows)
            .finish_non_exhaustive()
    }
}

impl FeedPaginator {
    /// Creates a paginator for `query`. Nothing is fetched until rows are requested.
    #[must_use]
    pub fn new(
        feed: Arc<dyn ImageFeedPort>,
        query: impl Into<String>,
        per_page: u32,
        max_rows: usize,
    ) -> Self {
        let effective = feed.page_size(per_page).max(1);
        if effective != per_page {
            warn!(
                feed = feed.name(),
                requested = per_page,
                per_page = effective,
                "Page size adjusted to what the feed serves"
            );
        }
        Self {
            feed,
            query: query.into(),
            per_page: effective,
            max_rows,
            state: RwLock::new(PaginatorState {
                next_page: 1,
                ..PaginatorState::default()
            }),
        }
    }

    /// Search query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Name of the underlying feed.
    #[must_use]
    pub fn feed_name(&self) -> &'static str {
        self.feed.name()
    }

    /// Snapshot of the loaded images, in feed order.
    #[must_use]
    pub fn images(&self) -> Vec<ImageItem> {
        self.state.read().images.clone()
    }

    /// Number of loaded images.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.state.read().images.len()
    }

    /// Total hits reported by the feed, once the first page arrived.
    #[must_use]
    pub fn total_hits(&self) -> Option<usize> {
        self.state.read().total_hits
    }

    /// Incremented whenever the loaded image list grows.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Number of page requests currently running.
    #[must_use]
    pub fn pages_in_flight(&self) -> usize {
        self.state.read().in_flight.len()
    }

    fn page_of(&self, index: usize) -> u32 {
        let page = index / self.per_page as usize;
        u32::try_from(page).unwrap_or(u32::MAX - 1) + 1
    }

    fn first_index_of(&self, page: u32) -> usize {
        (page as usize - 1) * self.per_page as usize
    }

    /// Pages covering `range` that are neither loaded nor requested, marked in flight.
    fn claim_pages(&self, range: IndexRange) -> Vec<u32> {
        let mut state = self.state.write();
        let limit = state.total_hits.map(|total| total.min(self.max_rows));
        let pages: Vec<u32> = (self.page_of(range.start)..=self.page_of(range.stop))
            .filter(|&page| !state.known_page(page))
            .filter(|&page| limit.is_none_or(|limit| self.first_index_of(page) < limit))
            .filter(|&page| self.first_index_of(page) < self.max_rows)
            .collect();
        state.in_flight.extend(pages.iter().copied());
        pages
    }

    fn store_page(&self, page: u32, result: FeedPage) {
        let mut state = self.state.write();
        state.in_flight.remove(&page);

        let received = result.items.len();
        let mut total = result.total_hits;
        if received < self.per_page as usize {
            total = total.min(self.first_index_of(page) + received);
        }
        state.total_hits = Some(state.total_hits.map_or(total, |known| known.min(total)));

        if page >= state.next_page {
            state.parked.insert(page, result.items);
            state.promote_parked();
        }
        debug!(
            page,
            received,
            loaded = state.images.len(),
            total_hits = ?state.total_hits,
            "Feed page stored"
        );
    }
}

#[async_trait]
impl RowLoader for FeedPaginator {
    fn is_row_loaded(&self, index: usize) -> bool {
        index < self.state.read().images.len()
    }

    fn row_count(&self) -> usize {
        let state = self.state.read();
        let known = state
            .total_hits
            .map_or(self.per_page as usize, |total| total.min(self.max_rows));
        known.max(state.images.len())
    }

    async fn load_more_rows(&self, range: IndexRange) -> Result<(), FeedError> {
        let pages = self.claim_pages(range);
        if pages.is_empty() {
            debug!(%range, "Rows already loaded or requested");
            return Ok(());
        }
        info!(%range, ?pages, query = %self.query, "Loading feed pages");

        let fetches = pages.iter().map(|&page| async move {
            (
                page,
                self.feed.fetch_page(&self.query, page, self.per_page).await,
            )
        });

        let mut first_error = None;
        for (page, result) in join_all(fetches).await {
            match result {
                Ok(feed_page) => self.store_page(page, feed_page),
                Err(e) => {
                    warn!(page, error = %e, "Failed to fetch feed page");
                    self.state.write().in_flight.remove(&page);
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockImageFeedPort;
    use mockall::predicate::{always, eq};

    fn page_items(page: u32, count: usize) -> Vec<ImageItem> {
        (0..count)
            .map(|i| ImageItem::new(format!("https://cdn.test/{page}/{i}.jpg")))
            .collect()
    }

    fn feed_with_total(total_hits: usize, per_page: usize) -> MockImageFeedPort {
        let mut feed = MockImageFeedPort::new();
        feed.expect_name().return_const("mock");
        feed.expect_page_size().returning(|requested| requested);
        feed.expect_fetch_page().returning(move |_, page, _| {
            let start = (page as usize - 1) * per_page;
            let count = total_hits.saturating_sub(start).min(per_page);
            Ok(FeedPage {
                items: page_items(page, count),
                total_hits,
            })
        });
        feed
    }

    #[test]
    fn test_row_count_before_first_page() {
        let paginator = FeedPaginator::new(Arc::new(feed_with_total(100, 20)), "cats", 20, 500);
        assert_eq!(paginator.row_count(), 20);
        assert!(!paginator.is_row_loaded(0));
    }

    #[tokio::test]
    async fn test_loads_covering_pages() {
        let paginator = FeedPaginator::new(Arc::new(feed_with_total(100, 20)), "cats", 20, 500);

        paginator
            .load_more_rows(IndexRange::new(0, 29))
            .await
            .unwrap();

        assert_eq!(paginator.loaded_count(), 40);
        assert_eq!(paginator.row_count(), 100);
        assert!(paginator.is_row_loaded(39));
        assert!(!paginator.is_row_loaded(40));
        assert_eq!(paginator.total_hits(), Some(100));
    }

    #[tokio::test]
    async fn test_loaded_pages_are_not_fetched_again() {
        let mut feed = MockImageFeedPort::new();
        feed.expect_name().return_const("mock");
        feed.expect_page_size().returning(|requested| requested);
        feed.expect_fetch_page()
            .with(eq("cats"), eq(1), eq(10))
            .times(1)
            .returning(|_, page, _| {
                Ok(FeedPage {
                    items: page_items(page, 10),
                    total_hits: 50,
                })
            });
        let paginator = FeedPaginator::new(Arc::new(feed), "cats", 10, 500);

        paginator.load_more_rows(IndexRange::new(0, 5)).await.unwrap();
        paginator.load_more_rows(IndexRange::new(3, 9)).await.unwrap();

        assert_eq!(paginator.loaded_count(), 10);
    }

    #[tokio::test]
    async fn test_short_page_clamps_total() {
        let paginator = FeedPaginator::new(Arc::new(feed_with_total(25, 20)), "cats", 20, 500);
        paginator.load_more_rows(IndexRange::new(0, 39)).await.unwrap();

        assert_eq!(paginator.loaded_count(), 25);
        assert_eq!(paginator.row_count(), 25);

        // Beyond the end nothing is requested.
        paginator.load_more_rows(IndexRange::new(25, 60)).await.unwrap();
        assert_eq!(paginator.loaded_count(), 25);
    }

    #[tokio::test]
    async fn test_row_count_capped_by_max_rows() {
        let paginator = FeedPaginator::new(Arc::new(feed_with_total(10_000, 50)), "sea", 50, 120);
        paginator.load_more_rows(IndexRange::new(0, 200)).await.unwrap();

        assert_eq!(paginator.row_count(), 150);
        assert_eq!(paginator.loaded_count(), 150);
    }

    #[tokio::test]
    async fn test_out_of_order_page_is_parked() {
        let paginator = FeedPaginator::new(Arc::new(feed_with_total(100, 10)), "cats", 10, 500);

        paginator.load_more_rows(IndexRange::new(10, 19)).await.unwrap();
        assert_eq!(paginator.loaded_count(), 0);
        let revision = paginator.revision();

        paginator.load_more_rows(IndexRange::new(0, 9)).await.unwrap();
        assert_eq!(paginator.loaded_count(), 20);
        assert!(paginator.revision() > revision);
        assert_eq!(paginator.images()[10].webformat_url, "https://cdn.test/2/0.jpg");
    }

    #[tokio::test]
    async fn test_failed_page_can_be_retried() {
        let mut feed = MockImageFeedPort::new();
        feed.expect_name().return_const("mock");
        feed.expect_page_size().returning(|requested| requested);
        let mut seq = mockall::Sequence::new();
        feed.expect_fetch_page()
            .with(always(), eq(1), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(FeedError::network("connection reset")));
        feed.expect_fetch_page()
            .with(always(), eq(1), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, page, _| {
                Ok(FeedPage {
                    items: page_items(page, 5),
                    total_hits: 5,
                })
            });
        let paginator = FeedPaginator::new(Arc::new(feed), "cats", 5, 500);

        let first = paginator.load_more_rows(IndexRange::new(0, 4)).await;
        assert!(matches!(first, Err(FeedError::Network { .. })));
        assert_eq!(paginator.pages_in_flight(), 0);

        paginator.load_more_rows(IndexRange::new(0, 4)).await.unwrap();
        assert_eq!(paginator.loaded_count(), 5);
    }

    fn clamping_feed(total_hits: usize) -> MockImageFeedPort {
        let mut feed = MockImageFeedPort::new();
        feed.expect_name().return_const("mock");
        feed.expect_page_size().returning(|requested| requested.clamp(3, 200));
        feed.expect_fetch_page().returning(move |_, page, per_page| {
            let per_page = per_page.clamp(3, 200) as usize;
            let start = (page as usize - 1) * per_page;
            let count = total_hits.saturating_sub(start).min(per_page);
            Ok(FeedPage {
                items: page_items(page, count),
                total_hits,
            })
        });
        feed
    }

    #[tokio::test]
    async fn test_oversized_page_request_uses_feed_page_size() {
        let paginator = FeedPaginator::new(Arc::new(clamping_feed(500)), "cats", 300, 500);
        paginator.load_more_rows(IndexRange::new(0, 10)).await.unwrap();

        assert_eq!(paginator.loaded_count(), 200);
        assert_eq!(paginator.row_count(), 500);
        assert_eq!(paginator.total_hits(), Some(500));
    }

    #[tokio::test]
    async fn test_undersized_page_request_keeps_index_math() {
        let paginator = FeedPaginator::new(Arc::new(clamping_feed(500)), "cats", 1, 500);
        paginator.load_more_rows(IndexRange::new(0, 5)).await.unwrap();

        assert_eq!(paginator.loaded_count(), 6);
        assert_eq!(paginator.row_count(), 500);
        assert_eq!(paginator.images()[3].webformat_url, "https://cdn.test/2/0.jpg");
    }

    #[tokio::test]
    async fn test_empty_result() {
        let paginator = FeedPaginator::new(Arc::new(feed_with_total(0, 20)), "zzz", 20, 500);
        paginator.load_more_rows(IndexRange::new(0, 0)).await.unwrap();
        assert_eq!(paginator.row_count(), 0);
    }
}
