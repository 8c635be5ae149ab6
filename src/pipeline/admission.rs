//! Admission gate bounding the number of live fetchers.
//!
//! The orchestrator owns one [`AdmissionGate`]. It takes a [`Slot`] before
//! pulling each descriptor and moves the slot into the fetcher task; the slot
//! frees itself when dropped, whether the fetcher succeeded, failed, or
//! panicked. This yields a sliding window: a fast fetcher frees its slot
//! immediately, so the pool stays saturated until the stream runs dry.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use super::error::OrchestratorError;

/// Upper bound on simultaneously running fetchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyBudget(NonZeroUsize);

impl ConcurrencyBudget {
    /// Validates a caller-supplied budget.
    ///
    /// Values above the semaphore's permit limit are clamped to it.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidBudget`] for `value <= 0`.
    pub fn new(value: i64) -> Result<Self, OrchestratorError> {
        usize::try_from(value)
            .ok()
            .map(|count| count.min(Semaphore::MAX_PERMITS))
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or(OrchestratorError::InvalidBudget { value })
    }

    /// Returns the budget as a count.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Counting gate limiting concurrent fetchers to the budget.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    budget: ConcurrencyBudget,
}

impl AdmissionGate {
    /// Creates a gate with `budget` free slots.
    #[must_use]
    pub fn new(budget: ConcurrencyBudget) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(budget.get())),
            budget,
        }
    }

    /// Waits until a slot is free and takes it.
    ///
    /// Returns `None` once `cancel` fires; cancellation wins over a slot
    /// that frees up at the same time.
    pub async fn admit(&self, cancel: &CancellationToken) -> Option<Slot> {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok()?,
        };
        Some(Slot { _permit: permit })
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.budget.get() - self.semaphore.available_permits()
    }
}

/// A held admission slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_budget_rejects_zero_and_negative() {
        assert!(matches!(
            ConcurrencyBudget::new(0),
            Err(OrchestratorError::InvalidBudget { value: 0 })
        ));
        assert!(matches!(
            ConcurrencyBudget::new(-5),
            Err(OrchestratorError::InvalidBudget { value: -5 })
        ));
    }

    #[test]
    fn test_budget_accepts_positive() {
        assert_eq!(ConcurrencyBudget::new(1).unwrap().get(), 1);
        assert_eq!(ConcurrencyBudget::new(4).unwrap().get(), 4);
    }

    #[test]
    fn test_budget_clamps_huge_values() {
        let budget = ConcurrencyBudget::new(i64::MAX).unwrap();
        assert_eq!(budget.get(), Semaphore::MAX_PERMITS);
    }

    #[tokio::test]
    async fn test_gate_tracks_in_flight_slots() {
        let gate = AdmissionGate::new(ConcurrencyBudget::new(2).unwrap());
        let cancel = CancellationToken::new();
        let first = gate.admit(&cancel).await.unwrap();
        let second = gate.admit(&cancel).await.unwrap();
        assert_eq!(gate.in_flight(), 2);

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        drop(second);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_gate_blocks_at_budget_until_slot_freed() {
        let gate = AdmissionGate::new(ConcurrencyBudget::new(1).unwrap());
        let cancel = CancellationToken::new();
        let held = gate.admit(&cancel).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.admit(&cancel)).await;
        assert!(blocked.is_err(), "admit must wait while the budget is used");

        drop(held);
        let admitted = tokio::time::timeout(Duration::from_millis(500), gate.admit(&cancel)).await;
        assert!(admitted.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_gate_admit_returns_none_when_cancelled() {
        let gate = AdmissionGate::new(ConcurrencyBudget::new(1).unwrap());
        let cancel = CancellationToken::new();
        let _held = gate.admit(&cancel).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.admit(&cancel).await.is_none() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        assert!(waiter.await.unwrap(), "a cancelled wait must not yield a slot");
        assert_eq!(gate.in_flight(), 1);
    }
}
