//! Image feed error types.

use thiserror::Error;

/// Errors raised while fetching pages from an image feed.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum FeedError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("feed returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("rate limited by feed, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("failed to decode feed response: {message}")]
    Decode { message: String },

    #[error("io error: {message}")]
    Io { message: String },

    #[error("invalid feed query: {reason}")]
    InvalidQuery { reason: String },
}

impl FeedError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates invalid query error.
    #[must_use]
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Returns whether retrying the same request may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimited { .. } | Self::Io { .. }
        ) || matches!(self, Self::Http { status, .. } if *status >= 500)
    }
}
