//! Image fetch and measurement error types.

use thiserror::Error;

/// Result type for image fetching and measurement.
pub type MeasureResult<T> = std::result::Result<T, MeasureError>;

/// Errors that can occur while resolving an image's natural size.
#[derive(Debug, Clone, Error)]
pub enum MeasureError {
    /// Failed to download the image.
    #[error("Network error: {0}")]
    Network(String),
    /// Failed to read a local image.
    #[error("IO error: {0}")]
    Io(String),
    /// Failed to decode the image bytes.
    #[error("Decode error: {0}")]
    Decode(String),
    /// URL scheme the fetcher cannot handle.
    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),
}
