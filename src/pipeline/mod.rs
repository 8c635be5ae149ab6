//! Bounded-concurrency download pipeline.
//!
//! A run has three kinds of component, all reporting to one supervisor:
//!
//! - [`Orchestrator`] - pulls descriptors and launches at most `budget`
//!   fetchers at a time
//! - fetchers - each retrieves one resource through a [`Fetch`] and hands the
//!   content to the sink
//! - [`Sink`] - the single writer; stores every item it receives
//!
//! Every component emits exactly one [`OutcomeRecord`]. The sink's record is
//! always the last one, and the outcome stream ends right after it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imgharvest_core::pipeline::{HttpFetcher, Pipeline, RunSummary};
//! use imgharvest_core::search::static_descriptors;
//! use imgharvest_core::{HttpTimeouts, ResourceDescriptor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new(HttpTimeouts::default())?);
//! let descriptors = static_descriptors(vec![ResourceDescriptor::new(
//!     "cat",
//!     "https://example.com/cat.png",
//! )]);
//!
//! let mut handle = Pipeline::new(fetcher, "./images", 4).spawn(descriptors);
//! let mut summary = RunSummary::new();
//! while let Some(record) = handle.outcomes().next().await {
//!     summary.record(&record);
//! }
//! println!("fetched {}", summary.fetched());
//! # Ok(())
//! # }
//! ```

mod admission;
mod error;
mod fetcher;
mod model;
mod orchestrator;
mod outcome;
mod sink;

pub use admission::{AdmissionGate, ConcurrencyBudget, Slot};
pub use error::{FetchError, OrchestratorError, PipelineError, SinkError};
pub use fetcher::{Fetch, HttpFetcher};
pub use model::{FetchedContent, ResourceDescriptor};
pub use orchestrator::Orchestrator;
pub use outcome::{
    ComponentKind, OUTCOME_CHANNEL_CAPACITY, OutcomeRecord, OutcomeReporter, OutcomeStatus,
    OutcomeStream, RunSummary, RunVerdict, outcome_channel,
};
pub use sink::Sink;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::search::DescriptorStream;
use outcome::supervise;

/// Default capacity of the content channel between fetchers and the sink.
///
/// Kept small so fetched bodies wait in their fetcher rather than pile up
/// in memory ahead of a slow sink.
pub const CONTENT_CHANNEL_CAPACITY: usize = 1;

/// Builder for one pipeline run.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetch>,
    output_dir: PathBuf,
    budget: i64,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("output_dir", &self.output_dir)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline writing into `output_dir` with at most `budget`
    /// concurrent fetchers.
    ///
    /// The budget is checked when the run starts; a value `<= 0` yields an
    /// orchestrator failure record rather than an error here.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetch>, output_dir: impl Into<PathBuf>, budget: i64) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            budget,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` instead of a private token, so a caller can stop the
    /// run before it holds the handle.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Starts the sink and the orchestrator and returns the supervisor's handle.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(self, descriptors: DescriptorStream) -> PipelineHandle {
        let (content_tx, content_rx) = mpsc::channel(CONTENT_CHANNEL_CAPACITY);
        let (reporter, outcomes) = outcome_channel(OUTCOME_CHANNEL_CAPACITY);

        debug!(
            output_dir = %self.output_dir.display(),
            budget = self.budget,
            "spawning pipeline"
        );

        let sink = Sink::new(self.output_dir, self.cancel.clone());
        let sink = tokio::spawn(supervise(
            ComponentKind::Sink,
            None,
            reporter.clone(),
            (),
            sink.run(content_rx),
        ));

        let orchestrator = Orchestrator::new(self.fetcher, self.budget, self.cancel.clone());
        let body_tx = content_tx.clone();
        let body_reporter = reporter.clone();
        // The orchestrator's own sender is released only after its record is sent.
        let orchestrator = tokio::spawn(supervise(
            ComponentKind::Orchestrator,
            None,
            reporter,
            content_tx,
            async move {
                orchestrator
                    .run(descriptors, body_tx, body_reporter)
                    .await
                    .map(|_launched| ())
            },
        ));

        PipelineHandle {
            outcomes,
            cancel: self.cancel,
            orchestrator,
            sink,
        }
    }
}

/// Supervisor side of a running pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    outcomes: OutcomeStream,
    cancel: CancellationToken,
    orchestrator: JoinHandle<()>,
    sink: JoinHandle<()>,
}

impl PipelineHandle {
    /// The outcome stream. It ends after the sink's record.
    pub fn outcomes(&mut self) -> &mut OutcomeStream {
        &mut self.outcomes
    }

    /// Requests cancellation. Records keep arriving until every component
    /// has stopped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Collects every remaining record and waits for the components to exit.
    pub async fn finish(self) -> Vec<OutcomeRecord> {
        let records = self.outcomes.collect().await;
        for (name, handle) in [("orchestrator", self.orchestrator), ("sink", self.sink)] {
            if let Err(error) = handle.await {
                warn!(component = name, %error, "component supervisor task failed");
            }
        }
        records
    }
}
