//! Fetches encoded image bytes from HTTP or the local filesystem.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, trace};

use crate::domain::errors::{MeasureError, MeasureResult};
use crate::domain::ports::ImageFetchPort;

const USER_AGENT: &str = concat!("pixwall/", env!("CARGO_PKG_VERSION"));

/// Where an image URL points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    /// `http://` or `https://` URL.
    Remote(String),
    /// `file://` URL or bare path.
    Local(PathBuf),
}

impl ImageLocation {
    /// Classifies `url`.
    ///
    /// # Errors
    /// Returns error for schemes other than http, https and file.
    pub fn parse(url: &str) -> MeasureResult<Self> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Self::Remote(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if url.is_empty() || url.contains("://") {
            return Err(MeasureError::UnsupportedSource(url.to_string()));
        }
        Ok(Self::Local(PathBuf::from(url)))
    }
}

/// Image fetcher backed by `reqwest` and `tokio::fs`.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    /// Creates a fetcher whose HTTP requests time out after `timeout_secs`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout_secs: u64) -> MeasureResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MeasureError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> MeasureResult<Bytes> {
        debug!(url = %url, "Downloading image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MeasureError::Network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MeasureError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| MeasureError::Network(format!("Failed to read body: {e}")))
    }
}

#[async_trait]
impl ImageFetchPort for ImageFetcher {
    async fn fetch(&self, url: &str) -> MeasureResult<Bytes> {
        match ImageLocation::parse(url)? {
            ImageLocation::Remote(url) => self.download(&url).await,
            ImageLocation::Local(path) => {
                trace!(path = %path.display(), "Reading local image");
                tokio::fs::read(&path).await.map(Bytes::from).map_err(|e| {
                    MeasureError::Io(format!("Failed to read {}: {e}", path.display()))
                })
            }
        }
    }
}
