//! Error types for the pipeline components.
//!
//! Each component has its own error enum. [`PipelineError`] wraps them and
//! is what an outcome record carries as its detail.

use std::path::PathBuf;

use thiserror::Error;

use super::outcome::ComponentKind;
use crate::naming::NamingError;
use crate::search::SearchError;

/// Errors that can occur while fetching one resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The locator that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The locator that timed out.
        url: String,
    },

    /// Non-success response status. The body is discarded.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The locator that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Reading the response body failed part way through.
    #[error("error reading body of {url}: {source}")]
    Body {
        /// The locator whose body could not be read.
        url: String,
        /// The underlying stream error.
        #[source]
        source: reqwest::Error,
    },

    /// The locator is not a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid locator.
        url: String,
    },

    /// The sink is no longer accepting content.
    #[error("content for {url} was rejected: sink is no longer receiving")]
    ContentRejected {
        /// The locator whose content could not be handed off.
        url: String,
    },

    /// The run was cancelled before the fetch completed.
    #[error("fetch of {url} cancelled")]
    Cancelled {
        /// The locator being fetched.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a content-rejected error.
    pub fn content_rejected(url: impl Into<String>) -> Self {
        Self::ContentRejected { url: url.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }
}

/// Errors that can occur while writing content to storage.
#[derive(Debug, Error)]
pub enum SinkError {
    /// No collision-free destination was found.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// File system error while creating or writing a file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// One or more items could not be written. Other items were still written.
    #[error("{failed} of {received} item(s) could not be written; first error: {first}")]
    WritesFailed {
        /// Number of items that failed to write.
        failed: usize,
        /// Number of items received.
        received: usize,
        /// The first write error encountered.
        first: Box<SinkError>,
    },

    /// The run was cancelled; received items were discarded.
    #[error("sink cancelled; {discarded} item(s) discarded")]
    Cancelled {
        /// Items received after cancellation and not written.
        discarded: usize,
    },
}

impl SinkError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that stop the orchestrator from admitting more work.
///
/// Individual fetch failures never appear here.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The concurrency budget is not a positive number.
    #[error("invalid concurrency budget {value}: must be at least 1")]
    InvalidBudget {
        /// The rejected value.
        value: i64,
    },

    /// The descriptor source failed.
    #[error("descriptor source failed: {0}")]
    Source(#[from] SearchError),

    /// The run was cancelled before the descriptor stream was exhausted.
    #[error("orchestrator cancelled after launching {launched} fetcher(s)")]
    Cancelled {
        /// Fetchers launched before cancellation.
        launched: usize,
    },
}

/// Detail payload of a failed outcome record.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A fetcher failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The orchestrator failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// A component body panicked.
    #[error("{component} panicked: {message}")]
    Panicked {
        /// The component whose body panicked.
        component: ComponentKind,
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl PipelineError {
    /// Creates a panic error for `component` from a join error.
    pub(crate) fn panicked(component: ComponentKind, error: tokio::task::JoinError) -> Self {
        let message = if error.is_panic() {
            let payload = error.into_panic();
            payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string())
        } else {
            "task was aborted".to_string()
        };
        Self::Panicked { component, message }
    }

    /// Returns true if this error stems from cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Fetch(FetchError::Cancelled { .. })
                | Self::Sink(SinkError::Cancelled { .. })
                | Self::Orchestrator(OrchestratorError::Cancelled { .. })
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/cat.png", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/cat.png"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_fetch_error_cancelled_is_cancellation() {
        let error = FetchError::cancelled("https://example.com/cat.png");
        assert!(PipelineError::from(error).is_cancelled());
    }

    #[test]
    fn test_sink_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = SinkError::io(PathBuf::from("/tmp/cat.png"), io_error);
        assert!(error.to_string().contains("/tmp/cat.png"));
    }

    #[test]
    fn test_sink_error_writes_failed_display() {
        let first = SinkError::io(
            PathBuf::from("/tmp/a.png"),
            std::io::Error::other("disk full"),
        );
        let error = SinkError::WritesFailed {
            failed: 2,
            received: 5,
            first: Box::new(first),
        };
        let msg = error.to_string();
        assert!(msg.starts_with("2 of 5"), "got: {msg}");
        assert!(msg.contains("disk full"), "got: {msg}");
    }

    #[test]
    fn test_orchestrator_error_invalid_budget_display() {
        let msg = OrchestratorError::InvalidBudget { value: -3 }.to_string();
        assert!(msg.contains("-3"));
        assert!(msg.contains("at least 1"));
    }

    #[test]
    fn test_pipeline_error_wraps_transparently() {
        let error = PipelineError::from(FetchError::timeout("https://example.com/x"));
        assert_eq!(error.to_string(), "timeout fetching https://example.com/x");
        assert!(!error.is_cancelled());
    }

    #[tokio::test]
    async fn test_pipeline_error_panicked_captures_message() {
        let should_panic = true;
        let join_error = tokio::spawn(async move {
            if should_panic {
                panic!("boom");
            }
        })
        .await
        .unwrap_err();
        let error = PipelineError::panicked(ComponentKind::Sink, join_error);
        assert_eq!(error.to_string(), "Sink panicked: boom");
    }
}
