//! Soft assertion collection.
//!
//! Failures logged during a unit are recorded here instead of aborting the
//! unit. The end-hook flushes the collector, turning any recorded failures
//! into one [`AggregatedAssertionError`].

use crate::error::AggregatedAssertionError;
use crate::worker::{WorkerId, WorkerMap};

/// Per-worker list of soft failures.
///
/// # Examples
///
/// ```
/// use unitscope::assertions::AssertionAggregator;
/// use unitscope::worker::WorkerId;
///
/// let aggregator = AssertionAggregator::new();
/// let worker = WorkerId::new(1);
/// assert!(aggregator.flush_all(worker).is_ok());
///
/// aggregator.record_failure(worker, "fail - totals differ");
/// let error = aggregator.flush_all(worker).unwrap_err();
/// assert_eq!(error.failures(), ["fail - totals differ"]);
/// assert!(aggregator.flush_all(worker).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct AssertionAggregator {
    failures: WorkerMap<Vec<String>>,
}

impl AssertionAggregator {
    /// Construct an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure to the worker's list, creating the list if needed.
    pub fn record_failure(&self, worker: WorkerId, message: impl Into<String>) {
        let message = message.into();
        self.failures
            .with_entry(worker, Vec::new, |failures| failures.push(message));
    }

    /// Consume the worker's recorded failures.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregatedAssertionError`] listing every recorded message
    /// in recording order when the list is non-empty. The list is emptied
    /// either way.
    pub fn flush_all(&self, worker: WorkerId) -> Result<(), AggregatedAssertionError> {
        let failures = self
            .failures
            .with_mut(worker, std::mem::take)
            .unwrap_or_default();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregatedAssertionError::new(failures))
        }
    }

    /// Recorded failures not yet flushed.
    #[must_use]
    pub fn pending(&self, worker: WorkerId) -> Vec<String> {
        self.failures.get(worker).unwrap_or_default()
    }

    /// Drop the worker's entry entirely.
    pub fn clear(&self, worker: WorkerId) {
        self.failures.remove(worker);
    }

    /// Whether the worker has an entry, flushed or not.
    #[must_use]
    pub fn tracks(&self, worker: WorkerId) -> bool {
        self.failures.contains(worker)
    }
}
