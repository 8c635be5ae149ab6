//! Outcome records and the supervisor channel.
//!
//! Every component instance emits exactly one [`OutcomeRecord`] before it
//! terminates. Records travel over a single bounded channel to the
//! supervisor, which reads an [`OutcomeStream`] until it ends.
//!
//! # Channel ownership
//!
//! Each component holds its own clone of the [`OutcomeReporter`]. The
//! channel closes when the last clone is dropped, so no component closes it
//! explicitly and no send can race a close. The pipeline arranges drop order
//! so that the sink's record is the last one the supervisor sees.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::error::PipelineError;

/// Default capacity of the outcome channel.
pub const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// The kind of component that emitted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Admits descriptors and launches fetchers.
    Orchestrator,
    /// Retrieves a single resource.
    Fetcher,
    /// Writes fetched content to storage.
    Sink,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Orchestrator => "Orchestrator",
            Self::Fetcher => "Fetcher",
            Self::Sink => "Sink",
        };
        f.write_str(name)
    }
}

/// Terminal status of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The component finished its work.
    Success,
    /// The component failed; see the record's detail.
    Failure,
}

/// The report a component emits when it terminates.
#[derive(Debug)]
pub struct OutcomeRecord {
    /// Which kind of component emitted this record.
    pub component: ComponentKind,
    /// What the component worked on (the locator, for fetchers).
    pub subject: Option<String>,
    /// Success or failure.
    pub status: OutcomeStatus,
    /// The error, for failures.
    pub detail: Option<PipelineError>,
}

impl OutcomeRecord {
    /// Creates a success record.
    #[must_use]
    pub fn success(component: ComponentKind, subject: Option<String>) -> Self {
        Self {
            component,
            subject,
            status: OutcomeStatus::Success,
            detail: None,
        }
    }

    /// Creates a failure record carrying `error`.
    #[must_use]
    pub fn failure(component: ComponentKind, subject: Option<String>, error: PipelineError) -> Self {
        Self {
            component,
            subject,
            status: OutcomeStatus::Failure,
            detail: Some(error),
        }
    }

    /// Converts a component result into a record.
    #[must_use]
    pub fn from_result<E>(
        component: ComponentKind,
        subject: Option<String>,
        result: Result<(), E>,
    ) -> Self
    where
        E: Into<PipelineError>,
    {
        match result {
            Ok(()) => Self::success(component, subject),
            Err(error) => Self::failure(component, subject, error.into()),
        }
    }

    /// Returns true for success records.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Creates the outcome channel: one reporter to clone into components and
/// the stream the supervisor reads.
#[must_use]
pub fn outcome_channel(capacity: usize) -> (OutcomeReporter, OutcomeStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (OutcomeReporter { tx }, OutcomeStream { rx })
}

/// Sending half of the outcome channel.
#[derive(Debug, Clone)]
pub struct OutcomeReporter {
    tx: mpsc::Sender<OutcomeRecord>,
}

impl OutcomeReporter {
    /// Sends a record, waiting for channel capacity.
    ///
    /// If the supervisor has stopped listening the record is dropped.
    pub async fn report(&self, record: OutcomeRecord) {
        trace!(component = %record.component, status = ?record.status, "emitting outcome");
        if let Err(mpsc::error::SendError(record)) = self.tx.send(record).await {
            debug!(
                component = %record.component,
                "supervisor stopped listening; outcome discarded"
            );
        }
    }
}

/// Receiving half of the outcome channel, owned by the supervisor.
#[derive(Debug)]
pub struct OutcomeStream {
    rx: mpsc::Receiver<OutcomeRecord>,
}

impl OutcomeStream {
    /// Receives the next record; `None` once every component has finished.
    pub async fn next(&mut self) -> Option<OutcomeRecord> {
        self.rx.recv().await
    }

    /// Reads records until the channel closes.
    pub async fn collect(mut self) -> Vec<OutcomeRecord> {
        let mut records = Vec::new();
        while let Some(record) = self.rx.recv().await {
            records.push(record);
        }
        records
    }
}

/// Runs a component body and reports its result as one outcome record.
///
/// The body runs in its own task so a panic becomes a failure record instead
/// of a lost one. `release` is dropped only after the record is sent.
pub(crate) async fn supervise<F, E, G>(
    component: ComponentKind,
    subject: Option<String>,
    reporter: OutcomeReporter,
    release: G,
    body: F,
) where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<PipelineError> + Send + 'static,
{
    let record = match tokio::spawn(body).await {
        Ok(result) => OutcomeRecord::from_result(component, subject, result),
        Err(join_error) => OutcomeRecord::failure(
            component,
            subject,
            PipelineError::panicked(component, join_error),
        ),
    };
    reporter.report(record).await;
    drop(release);
}

/// Overall verdict of a run, derived from its outcome records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunVerdict {
    /// Every component succeeded.
    Success,
    /// Orchestrator and sink succeeded but some fetchers failed.
    Partial,
    /// The orchestrator or the sink failed.
    Failure,
}

/// Counts folded from the outcome stream.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    fetched: usize,
    fetch_failed: usize,
    orchestrator: Option<OutcomeStatus>,
    sink: Option<OutcomeStatus>,
}

impl RunSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into the summary.
    pub fn record(&mut self, record: &OutcomeRecord) {
        match record.component {
            ComponentKind::Fetcher if record.is_success() => self.fetched += 1,
            ComponentKind::Fetcher => self.fetch_failed += 1,
            ComponentKind::Orchestrator => self.orchestrator = Some(record.status),
            ComponentKind::Sink => self.sink = Some(record.status),
        }
    }

    /// Number of successful fetchers.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Number of failed fetchers.
    #[must_use]
    pub fn fetch_failed(&self) -> usize {
        self.fetch_failed
    }

    /// Derives the verdict. A missing orchestrator or sink record counts as failure.
    #[must_use]
    pub fn verdict(&self) -> RunVerdict {
        let core_ok = self.orchestrator == Some(OutcomeStatus::Success)
            && self.sink == Some(OutcomeStatus::Success);
        if !core_ok {
            RunVerdict::Failure
        } else if self.fetch_failed > 0 {
            RunVerdict::Partial
        } else {
            RunVerdict::Success
        }
    }
}
