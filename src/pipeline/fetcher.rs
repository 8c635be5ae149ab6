//! Fetchers: retrieve one resource and hand its content to the sink.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::error::FetchError;
use super::model::FetchedContent;
use crate::http::{HttpTimeouts, build_client};
use crate::naming::suggested_name_from_url;

/// Largest body size pre-allocated from a `Content-Length` header.
const MAX_PREALLOCATED_BODY: usize = 16 * 1024 * 1024;

/// Retrieval of a single resource by locator.
///
/// Implementations perform exactly one attempt; there is no retry here.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Retrieves the resource at `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-success status, or a
    /// body that cannot be read to the end.
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError>;
}

/// HTTP(S) fetcher backed by a shared `reqwest` client.
///
/// Create once and share through an `Arc`; connections are pooled.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, FetchError> {
        let client = build_client(timeouts).map_err(|e| FetchError::network("<client>", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError> {
        let url = Url::parse(locator).map_err(|_| FetchError::invalid_url(locator))?;

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(locator)
            } else {
                FetchError::network(locator, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(locator, status.as_u16()));
        }

        let capacity = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0)
            .min(MAX_PREALLOCATED_BODY);
        let mut body = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    FetchError::timeout(locator)
                } else {
                    FetchError::body(locator, e)
                }
            })?;
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "fetched body");
        Ok(FetchedContent::new(suggested_name_from_url(&url), body))
    }
}

/// Body of one fetcher task: fetch, then hand the content to the sink.
///
/// Both the retrieval and the hand-off race against `cancel`.
pub(crate) async fn run_fetcher(
    fetcher: Arc<dyn Fetch>,
    locator: String,
    content_tx: mpsc::Sender<FetchedContent>,
    cancel: CancellationToken,
) -> Result<(), FetchError> {
    let content = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(FetchError::cancelled(locator.as_str())),
        result = fetcher.fetch(&locator) => result?,
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::cancelled(locator.as_str())),
        sent = content_tx.send(content) => {
            sent.map_err(|_| FetchError::content_rejected(locator.as_str()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct StaticFetch {
        body: &'static [u8],
    }

    #[async_trait]
    impl Fetch for StaticFetch {
        async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError> {
            let url = Url::parse(locator).map_err(|_| FetchError::invalid_url(locator))?;
            Ok(FetchedContent::new(
                suggested_name_from_url(&url),
                self.body.to_vec(),
            ))
        }
    }

    struct HangingFetch;

    #[async_trait]
    impl Fetch for HangingFetch {
        async fn fetch(&self, _locator: &str) -> Result<FetchedContent, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(FetchError::timeout("never"))
        }
    }

    #[tokio::test]
    async fn test_run_fetcher_sends_content() {
        let (tx, mut rx) = mpsc::channel(1);
        let result = run_fetcher(
            Arc::new(StaticFetch { body: b"png" }),
            "https://example.com/img/cat.png".to_string(),
            tx,
            CancellationToken::new(),
        )
        .await;

        assert!(result.is_ok());
        let content = rx.recv().await.unwrap();
        assert_eq!(content.suggested_name(), "cat.png");
        assert_eq!(content.into_parts().1, b"png");
    }

    #[tokio::test]
    async fn test_run_fetcher_error_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(1);
        let result = run_fetcher(
            Arc::new(StaticFetch { body: b"" }),
            "not a url".to_string(),
            tx,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_fetcher_rejected_when_sink_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = run_fetcher(
            Arc::new(StaticFetch { body: b"x" }),
            "https://example.com/a.png".to_string(),
            tx,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(FetchError::ContentRejected { .. })));
    }

    #[tokio::test]
    async fn test_run_fetcher_honors_cancellation() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_fetcher(
            Arc::new(HangingFetch),
            "https://example.com/slow.png".to_string(),
            tx,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(HttpTimeouts::default()).is_ok());
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_invalid_url() {
        let fetcher = HttpFetcher::new(HttpTimeouts::default()).unwrap();
        let result = fetcher.fetch("::not-a-url::").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
