//! Image search client for the Bing image search API.
//!
//! The backend answers `GET <endpoint>?$format=json&Query='<terms>'` with
//! a JSON document shaped like `{"d": {"results": [{"Title", "MediaUrl"}]}}`.
//! Only the title and media URL of each result are kept.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use super::{DescriptorSource, SearchError};
use crate::http::{HttpTimeouts, build_client};
use crate::pipeline::ResourceDescriptor;

/// Default image search endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.datamarket.azure.com/Bing/Search/Image";

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "d", alias = "D")]
    data: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(rename = "results", alias = "Results", default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "Title", alias = "title", default)]
    title: String,
    #[serde(rename = "MediaUrl", alias = "mediaUrl")]
    media_url: String,
}

/// Parses a search response body into resource descriptors.
///
/// Unknown fields are ignored.
///
/// # Errors
///
/// Returns the JSON decoding error when the body does not match the
/// expected envelope.
pub fn parse_search_response(body: &[u8]) -> Result<Vec<ResourceDescriptor>, serde_json::Error> {
    let envelope: SearchEnvelope = serde_json::from_slice(body)?;
    Ok(envelope
        .data
        .results
        .into_iter()
        .map(|hit| ResourceDescriptor::new(hit.title, hit.media_url))
        .collect())
}

/// Search client issuing authenticated image queries.
///
/// The access key is sent as both user name and password of HTTP basic auth.
#[derive(Debug, Clone)]
pub struct ImageSearchClient {
    client: Client,
    endpoint: Url,
    access_key: Option<String>,
}

impl ImageSearchClient {
    /// Creates a client for `endpoint` with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidEndpoint`] if `endpoint` does not parse
    /// as a URL, or [`SearchError::Network`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        access_key: Option<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, SearchError> {
        let raw = endpoint.into();
        let endpoint = Url::parse(&raw)
            .map_err(|e| SearchError::invalid_endpoint(raw.as_str(), &e.to_string()))?;
        let client = build_client(timeouts).map_err(|e| SearchError::network(raw, e))?;
        Ok(Self {
            client,
            endpoint,
            access_key: access_key.filter(|key| !key.is_empty()),
        })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Appends the query parameters, keeping any the endpoint already has.
    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("$format", "json")
            .append_pair("Query", &format!("'{query}'"));
        url
    }
}

#[async_trait]
impl DescriptorSource for ImageSearchClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn search(&self, query: &str) -> Result<Vec<ResourceDescriptor>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = self.request_url(query);
        debug!(%url, "sending search query");

        let mut request = self.client.get(url);
        if let Some(key) = &self.access_key {
            request = request.basic_auth(key, Some(key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::network(self.endpoint.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::http_status(
                self.endpoint.as_str(),
                status.as_u16(),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::network(self.endpoint.as_str(), e))?;
        let descriptors = parse_search_response(&body)
            .map_err(|e| SearchError::parse(self.endpoint.as_str(), e))?;

        info!(results = descriptors.len(), "search complete");
        Ok(descriptors)
    }
}
