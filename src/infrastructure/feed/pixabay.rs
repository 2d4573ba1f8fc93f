//! Pixabay image search client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, warn};

use super::dto::SearchResponse;
use crate::domain::entities::FeedPage;
use crate::domain::errors::FeedError;
use crate::domain::ports::ImageFeedPort;

const PIXABAY_API_BASE: &str = "https://pixabay.com";
const USER_AGENT: &str = concat!("pixwall/", env!("CARGO_PKG_VERSION"));
/// Smallest page size the API accepts.
pub const MIN_PER_PAGE: u32 = 3;
/// Largest page size the API accepts.
pub const MAX_PER_PAGE: u32 = 200;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const MAX_QUERY_LEN: usize = 100;

/// Pixabay search API client.
pub struct PixabayClient {
    client: Client,
    base_url: String,
    api_key: String,
    safesearch: bool,
}

impl std::fmt::Debug for PixabayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixabayClient")
            .field("base_url", &self.base_url)
            .field("safesearch", &self.safesearch)
            .finish_non_exhaustive()
    }
}

impl PixabayClient {
    /// Creates new client with default base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, FeedError> {
        Self::with_base_url(PIXABAY_API_BASE, api_key, timeout_secs)
    }

    /// Creates client with custom base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FeedError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            safesearch: true,
        })
    }

    /// Enables or disables safe search.
    #[must_use]
    pub const fn with_safesearch(mut self, safesearch: bool) -> Self {
        self.safesearch = safesearch;
        self
    }

    fn search_url(&self) -> String {
        format!("{}/api/", self.base_url)
    }

    fn query_params(&self, query: &str, page: u32, per_page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("q", query.trim().to_string()),
            ("page", page.max(1).to_string()),
            (
                "per_page",
                self.page_size(per_page).to_string(),
            ),
            ("image_type", "photo".to_string()),
            ("safesearch", self.safesearch.to_string()),
        ]
    }
}

fn validate_query(query: &str) -> Result<(), FeedError> {
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(FeedError::invalid_query(format!(
            "query exceeds {MAX_QUERY_LEN} characters"
        )));
    }
    Ok(())
}

fn map_status(status: StatusCode, retry_after: Option<u64>, body: String) -> FeedError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FeedError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        StatusCode::BAD_REQUEST if body.contains("Invalid or missing API key") => {
            FeedError::Http {
                status: status.as_u16(),
                message: "invalid or missing API key".to_string(),
            }
        }
        _ => FeedError::Http {
            status: status.as_u16(),
            message: if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

#[async_trait]
impl ImageFeedPort for PixabayClient {
    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<FeedPage, FeedError> {
        validate_query(query)?;
        debug!(query = %query, page, per_page, "Searching Pixabay");

        let response = self
            .client
            .get(self.search_url())
            .query(&self.query_params(query, page, per_page))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach Pixabay");
                if e.is_timeout() {
                    FeedError::network("request timed out")
                } else if e.is_connect() {
                    FeedError::network("failed to connect to Pixabay")
                } else {
                    FeedError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("X-RateLimit-Reset")
                .or_else(|| response.headers().get(header::RETRY_AFTER))
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, retry_after, body));
        }

        let search: SearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse Pixabay response");
            FeedError::decode(format!("failed to parse response: {e}"))
        })?;

        debug!(
            total = search.total,
            total_hits = search.total_hits,
            received = search.hits.len(),
            "Pixabay page received"
        );
        Ok(search.into())
    }

    fn page_size(&self, requested: u32) -> u32 {
        requested.clamp(MIN_PER_PAGE, MAX_PER_PAGE)
    }

    fn name(&self) -> &'static str {
        "pixabay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn client() -> PixabayClient {
        PixabayClient::with_base_url("http://localhost:9/", "secret", 5).unwrap()
    }

    #[test]
    fn test_search_url_trims_slash() {
        assert_eq!(client().search_url(), "http://localhost:9/api/");
    }

    #[test_case(1, 3 ; "below_minimum")]
    #[test_case(50, 50 ; "in_range")]
    #[test_case(500, 200 ; "above_maximum")]
    fn test_per_page_clamped(requested: u32, expected: u32) {
        let params = client().query_params("cats", 1, requested);
        assert!(params.contains(&("per_page", expected.to_string())));
    }

    #[test]
    fn test_query_params() {
        let params = client().with_safesearch(false).query_params(" red roses ", 0, 20);
        assert!(params.contains(&("key", "secret".to_string())));
        assert!(params.contains(&("q", "red roses".to_string())));
        assert!(params.contains(&("page", "1".to_string())));
        assert!(params.contains(&("image_type", "photo".to_string())));
        assert!(params.contains(&("safesearch", "false".to_string())));
    }

    #[test]
    fn test_rejects_long_query() {
        let query = "a".repeat(101);
        assert!(matches!(
            validate_query(&query),
            Err(FeedError::InvalidQuery { .. })
        ));
        assert!(validate_query("yellow flowers").is_ok());
    }

    #[test]
    fn test_map_status() {
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, Some(12), String::new()),
            FeedError::RateLimited {
                retry_after_secs: 12
            }
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, None, String::new()),
            FeedError::RateLimited {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            }
        ));
        let err = map_status(
            StatusCode::BAD_REQUEST,
            None,
            "[ERROR 400] Invalid or missing API key".to_string(),
        );
        assert_eq!(err.to_string(), "feed returned HTTP 400: invalid or missing API key");
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "total": 4692,
            "totalHits": 500,
            "hits": [
                {"id": 1, "webformatURL": "https://pixabay.com/get/a_640.jpg", "likes": 3},
                {"id": 2, "webformatURL": "https://pixabay.com/get/b_640.jpg"}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let page: FeedPage = response.into();
        assert_eq!(page.total_hits, 500);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].likes, 3);
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let result = client().fetch_page("cats", 1, 20).await;
        assert!(matches!(result, Err(FeedError::Network { .. })));
    }
}
