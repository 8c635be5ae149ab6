//! Run configuration and the search-to-disk entry point.
//!
//! [`HarvestConfig`] bundles everything one run needs. [`start_harvest`]
//! wires the image search client in as the descriptor source and the HTTP
//! fetcher as the fetch transport, then spawns the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::http::HttpTimeouts;
use crate::pipeline::{FetchError, HttpFetcher, Pipeline, PipelineHandle};
use crate::search::{DEFAULT_SEARCH_ENDPOINT, ImageSearchClient, SearchError, descriptor_stream};

/// Default concurrency budget.
pub const DEFAULT_MAX_ROUTINES: i64 = 4;

/// Errors that prevent a run from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The query is empty or whitespace.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The output path exists but is not a directory.
    #[error("output path is not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The search client could not be built.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The fetch client could not be built.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Settings for one search-and-download run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Directory receiving downloaded files.
    pub output_dir: PathBuf,
    /// Maximum concurrent fetchers. Checked by the orchestrator, not here.
    pub max_routines: i64,
    /// The search query.
    pub query: String,
    /// Search API access key.
    pub access_key: Option<String>,
    /// Search endpoint URL.
    pub endpoint: String,
    /// Timeouts shared by search and fetch traffic.
    pub timeouts: HttpTimeouts,
}

impl HarvestConfig {
    /// Creates a config with default endpoint, budget, and timeouts.
    #[must_use]
    pub fn new(query: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_routines: DEFAULT_MAX_ROUTINES,
            query: query.into(),
            access_key: None,
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            timeouts: HttpTimeouts::default(),
        }
    }

    /// Rejects settings that make a run pointless before any network use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyQuery`] or [`ConfigError::NotADirectory`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.trim().is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.output_dir.clone(),
            });
        }
        Ok(())
    }

    /// Creates the output directory if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CreateDir`] on IO failure.
    pub async fn ensure_output_dir(&self) -> Result<(), ConfigError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| ConfigError::CreateDir {
                path: self.output_dir.clone(),
                source,
            })
    }
}

/// Validates `config`, prepares the output directory, and spawns a pipeline
/// fed by the image search. Cancelling `cancel` stops the run.
///
/// The search itself runs inside the pipeline, so its failure is reported
/// as the orchestrator's outcome rather than returned here.
///
/// # Errors
///
/// Returns [`ConfigError`] if the config is invalid or a client cannot be built.
#[instrument(skip(config, cancel), fields(query = %config.query, budget = config.max_routines))]
pub async fn start_harvest(
    config: &HarvestConfig,
    cancel: CancellationToken,
) -> Result<PipelineHandle, ConfigError> {
    config.validate()?;
    config.ensure_output_dir().await?;

    let search = ImageSearchClient::new(
        config.endpoint.clone(),
        config.access_key.clone(),
        config.timeouts,
    )?;
    let fetcher = HttpFetcher::new(config.timeouts)?;

    debug!(endpoint = search.endpoint(), "starting harvest");
    let descriptors = descriptor_stream(Arc::new(search), config.query.clone());
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        config.output_dir.clone(),
        config.max_routines,
    )
    .with_cancellation(cancel);
    Ok(pipeline.spawn(descriptors))
}
