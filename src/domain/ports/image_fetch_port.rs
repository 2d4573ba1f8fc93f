//! Port definition for fetching raw image bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::MeasureResult;

/// Port for fetching image bytes from a URL.
/// Implementations must be thread-safe.
#[async_trait]
pub trait ImageFetchPort: Send + Sync {
    /// Fetches the encoded image behind `url`.
    async fn fetch(&self, url: &str) -> MeasureResult<Bytes>;
}
