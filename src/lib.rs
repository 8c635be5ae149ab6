//! imgharvest Core Library
//!
//! Searches an image index and downloads every result through a
//! bounded-concurrency pipeline: one orchestrator, up to N concurrent
//! fetchers, and a single sink writing to disk. Every component reports one
//! outcome record to the caller's supervisor.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`pipeline`] - Orchestrator, fetchers, sink, and the outcome channel
//! - [`search`] - Descriptor sources and the image search client
//! - [`naming`] - Collision-free destination paths
//! - [`http`] - Shared HTTP client construction
//! - [`harvest`] - Run configuration and the search-to-disk entry point

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod harvest;
pub mod http;
pub mod naming;
pub mod pipeline;
pub mod search;

// Re-export commonly used types
pub use harvest::{ConfigError, DEFAULT_MAX_ROUTINES, HarvestConfig, start_harvest};
pub use http::{CONNECT_TIMEOUT_SECS, HttpTimeouts, READ_TIMEOUT_SECS};
pub use naming::{MAX_DISAMBIGUATORS, NamingError, unique_destination};
pub use pipeline::{
    ComponentKind, Fetch, FetchError, FetchedContent, HttpFetcher, OrchestratorError,
    OutcomeRecord, OutcomeStatus, Pipeline, PipelineError, PipelineHandle, ResourceDescriptor,
    RunSummary, RunVerdict, SinkError,
};
pub use search::{
    DEFAULT_SEARCH_ENDPOINT, DescriptorSource, ImageSearchClient, SearchError, descriptor_stream,
};
