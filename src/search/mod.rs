//! Descriptor sources feeding the download pipeline.
//!
//! A [`DescriptorSource`] turns a query into [`ResourceDescriptor`]s. The
//! pipeline never calls a source directly; it consumes a
//! [`DescriptorStream`], which lets the query run lazily as the head of the
//! stream while the orchestrator is already waiting for input.
//!
//! - [`DescriptorSource`] - Async trait implemented by search backends
//! - [`ImageSearchClient`] - Bing image search implementation
//! - [`descriptor_stream`] - Adapts a source and query into a stream
//! - [`static_descriptors`] - Stream over a fixed list (tests, replays)

mod client;
mod error;

pub use client::{DEFAULT_SEARCH_ENDPOINT, ImageSearchClient, parse_search_response};
pub use error::SearchError;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::pipeline::ResourceDescriptor;

/// Stream of descriptors consumed by the orchestrator.
///
/// An `Err` item means the source itself failed; the orchestrator stops
/// admitting new work when it sees one.
pub type DescriptorStream = BoxStream<'static, Result<ResourceDescriptor, SearchError>>;

/// A producer of resource descriptors for a query.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Runs `query` and returns every descriptor it yields.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the backend cannot be reached or its
    /// response cannot be parsed. No descriptors are produced in that case.
    async fn search(&self, query: &str) -> Result<Vec<ResourceDescriptor>, SearchError>;
}

/// Builds a lazy descriptor stream: the query runs on first poll.
#[must_use]
pub fn descriptor_stream(
    source: Arc<dyn DescriptorSource>,
    query: impl Into<String>,
) -> DescriptorStream {
    let query = query.into();
    stream::once(async move { source.search(&query).await })
        .flat_map(|result| match result {
            Ok(descriptors) => stream::iter(descriptors.into_iter().map(Ok)).left_stream(),
            Err(error) => stream::iter(std::iter::once(Err(error))).right_stream(),
        })
        .boxed()
}

/// Builds a stream over an already known list of descriptors.
#[must_use]
pub fn static_descriptors(descriptors: Vec<ResourceDescriptor>) -> DescriptorStream {
    stream::iter(descriptors.into_iter().map(Ok)).boxed()
}
