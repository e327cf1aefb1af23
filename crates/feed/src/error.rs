//! Error types for options chain retrieval.
//!
//! Every failure at the network boundary is classified into an
//! [`ErrorClass`] so the fetcher can dispatch on it explicitly.

use thiserror::Error;

/// Errors that can occur while retrieving an options chain.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Upstream signalled rate limiting (HTTP 429).
    #[error("rate limit exceeded, retry after {}", retry_after_display(.retry_after_secs))]
    RateLimited {
        /// Value of the Retry-After header, when present.
        retry_after_secs: Option<u64>,
    },

    /// Credentials rejected (HTTP 401/403).
    #[error("unauthorized: {status_code} - {message}")]
    Unauthorized {
        /// HTTP status code.
        status_code: u16,
        /// Error body from the API.
        message: String,
    },

    /// Any other non-success status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error body from the API.
        message: String,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Symbol rejected before any request was made.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Credentials or client setup error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Fallback snapshot could not be loaded.
    #[error("fallback snapshot unavailable at {path}: {reason}")]
    MissingFallback {
        /// Configured snapshot path.
        path: String,
        /// Why it could not be used.
        reason: String,
    },
}

fn retry_after_display(secs: &Option<u64>) -> String {
    match secs {
        Some(s) => format!("{s}s"),
        None => "unspecified".to_string(),
    }
}

/// How the fetcher reacts to a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Back off and retry.
    RateLimited,
    /// Go straight to the fallback snapshot; retrying cannot fix credentials.
    Unauthorized,
    /// Go straight to the fallback snapshot without retrying.
    Transient,
}

impl FeedError {
    /// Creates an error from a non-success HTTP status.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        match status_code {
            401 | 403 => Self::Unauthorized {
                status_code,
                message: message.into(),
            },
            _ => Self::Api {
                status_code,
                message: message.into(),
            },
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a missing fallback error.
    pub fn missing_fallback(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingFallback {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classifies the error for retry/fallback dispatch.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited { .. } => ErrorClass::RateLimited,
            Self::Unauthorized { .. } | Self::Configuration(_) => ErrorClass::Unauthorized,
            Self::Api { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::Malformed(_)
            | Self::InvalidSymbol(_)
            | Self::MissingFallback { .. } => ErrorClass::Transient,
        }
    }

    /// Returns true if the fetcher will retry after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::RateLimited
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
