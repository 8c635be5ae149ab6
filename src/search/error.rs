//! Error types for search operations.

use thiserror::Error;

/// Errors that can occur while querying the image search backend.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error querying {endpoint}: {source}")]
    Network {
        /// The search endpoint.
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("HTTP {status} from search endpoint {endpoint}")]
    HttpStatus {
        /// The search endpoint.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body is not the expected JSON document.
    #[error("malformed search response from {endpoint}: {source}")]
    Parse {
        /// The search endpoint.
        endpoint: String,
        /// The JSON decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured endpoint is not an absolute URL.
    #[error("invalid search endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The query string is empty.
    #[error("search query must not be empty")]
    EmptyQuery,
}

impl SearchError {
    /// Creates a network error from a reqwest error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: &str) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a parse error.
    pub fn parse(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            endpoint: endpoint.into(),
            source,
        }
    }
}
