use serde::Deserialize;

use crate::domain::entities::{FeedPage, ImageItem};

/// Pixabay search response structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Total matches in the Pixabay index.
    #[serde(default)]
    pub total: usize,
    /// Matches reachable through the API (capped by Pixabay).
    #[serde(default)]
    pub total_hits: usize,
    /// Results on this page.
    #[serde(default)]
    pub hits: Vec<ImageItem>,
}

impl From<SearchResponse> for FeedPage {
    fn from(response: SearchResponse) -> Self {
        Self {
            items: response.hits,
            total_hits: response.total_hits,
        }
    }
}
