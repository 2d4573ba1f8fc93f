//! Image feed port definition.

use async_trait::async_trait;

use crate::domain::entities::FeedPage;
use crate::domain::errors::FeedError;

/// Port for paged image searches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFeedPort: Send + Sync {
    /// Fetches one page (1-based) of results for `query`.
    async fn fetch_page(&self, query: &str, page: u32, per_page: u32)
    -> Result<FeedPage, FeedError>;

    /// Page size the feed actually serves when `requested` is asked for.
    fn page_size(&self, requested: u32) -> u32;

    /// Short name shown in the status bar.
    fn name(&self) -> &'static str;
}
