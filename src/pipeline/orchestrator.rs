//! The orchestrator: turns a descriptor stream into bounded concurrent fetches.
//!
//! # Admission
//!
//! For each descriptor the orchestrator first takes a slot from its
//! [`AdmissionGate`], then pulls the next descriptor and launches one fetcher
//! task holding that slot. When the budget is used up it blocks before
//! accepting another descriptor; any finishing fetcher frees a slot.
//!
//! # Failure policy
//!
//! A failing fetcher does not cancel its siblings and does not change the
//! orchestrator's own outcome. The orchestrator fails only for an invalid
//! budget, a failing descriptor source, or cancellation. In every case it
//! still joins all launched fetchers before returning.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::admission::{AdmissionGate, ConcurrencyBudget};
use super::error::OrchestratorError;
use super::fetcher::{Fetch, run_fetcher};
use super::model::FetchedContent;
use super::outcome::{ComponentKind, OutcomeReporter, supervise};
use crate::search::DescriptorStream;

/// Launches fetchers for a descriptor stream under a concurrency budget.
#[derive(Clone)]
pub struct Orchestrator {
    fetcher: Arc<dyn Fetch>,
    budget: i64,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("budget", &self.budget)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// The budget is validated when [`run`](Self::run) starts, so an invalid
    /// value surfaces as the orchestrator's failure outcome.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetch>, budget: i64, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            budget,
            cancel,
        }
    }

    /// Consumes `descriptors`, launching one fetcher per descriptor.
    ///
    /// Returns the number of fetchers launched once every one of them has
    /// terminated and reported.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::InvalidBudget`] for a budget `<= 0`; nothing is launched
    /// - [`OrchestratorError::Source`] if the stream yields an error
    /// - [`OrchestratorError::Cancelled`] if the run was cancelled
    #[instrument(skip(self, descriptors, content_tx, reporter), fields(budget = self.budget))]
    pub async fn run(
        self,
        mut descriptors: DescriptorStream,
        content_tx: mpsc::Sender<FetchedContent>,
        reporter: OutcomeReporter,
    ) -> Result<usize, OrchestratorError> {
        let gate = AdmissionGate::new(ConcurrencyBudget::new(self.budget)?);
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        info!("starting descriptor admission");

        let admission = loop {
            let Some(slot) = gate.admit(&self.cancel).await else {
                break Err(OrchestratorError::Cancelled {
                    launched: handles.len(),
                });
            };

            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    break Err(OrchestratorError::Cancelled { launched: handles.len() });
                }
                next = descriptors.next() => next,
            };

            let descriptor = match next {
                None => break Ok(()),
                Some(Err(source)) => break Err(OrchestratorError::Source(source)),
                Some(Ok(descriptor)) => descriptor,
            };

            debug!(
                title = %descriptor.title,
                locator = %descriptor.locator,
                in_flight = gate.in_flight(),
                "launching fetcher"
            );

            let locator = descriptor.locator;
            let body = run_fetcher(
                Arc::clone(&self.fetcher),
                locator.clone(),
                content_tx.clone(),
                self.cancel.clone(),
            );
            // The slot and a content sender stay alive until the record is sent.
            handles.push(tokio::spawn(supervise(
                ComponentKind::Fetcher,
                Some(locator),
                reporter.clone(),
                (slot, content_tx.clone()),
                body,
            )));
        };

        let launched = handles.len();
        debug!(launched, "waiting for fetchers to finish");

        for handle in handles {
            if let Err(error) = handle.await {
                warn!(%error, "fetcher supervisor task failed");
            }
        }

        info!(launched, "descriptor admission complete");
        admission.map(|()| launched)
    }
}
