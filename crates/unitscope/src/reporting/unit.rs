//! Per-unit report handles and the records rendered from them.

use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};

use crate::status::StatusValue;

/// One line logged against a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    status: StatusValue,
    description: String,
    artifact: Option<Utf8PathBuf>,
}

impl LogEntry {
    /// Construct an entry.
    ///
    /// # Examples
    /// ```
    /// use unitscope::StatusValue;
    /// use unitscope::reporting::LogEntry;
    ///
    /// let entry = LogEntry::new(StatusValue::Pass, "logged in", None);
    /// assert_eq!(entry.status(), StatusValue::Pass);
    /// assert_eq!(entry.description(), "logged in");
    /// assert!(entry.artifact().is_none());
    /// ```
    #[must_use]
    pub fn new(
        status: StatusValue,
        description: impl Into<String>,
        artifact: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            status,
            description: description.into(),
            artifact,
        }
    }

    /// Status of the entry.
    #[must_use]
    pub fn status(&self) -> StatusValue {
        self.status
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Screenshot attached to the entry, if any.
    #[must_use]
    pub fn artifact(&self) -> Option<&Utf8Path> {
        self.artifact.as_deref()
    }
}

/// Final state of a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The unit has not reached its end-hook.
    #[default]
    Pending,
    /// The unit finished without failures.
    Passed,
    /// The unit failed.
    Failed,
}

impl UnitOutcome {
    /// Lowercase label for rendered reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Default)]
struct UnitState {
    outcome: UnitOutcome,
    entries: Vec<LogEntry>,
}

/// The "current unit" a worker logs into.
///
/// Handles are created by [`ReportSink::create_unit`](super::ReportSink::create_unit),
/// which keeps a reference for rendering; the owning worker keeps the other.
#[derive(Debug)]
pub struct UnitHandle {
    name: String,
    state: Mutex<UnitState>,
}

impl UnitHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(UnitState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UnitState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Unit name as reported by its descriptor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an entry.
    pub fn log(
        &self,
        status: StatusValue,
        description: impl Into<String>,
        artifact: Option<Utf8PathBuf>,
    ) {
        self.lock()
            .entries
            .push(LogEntry::new(status, description, artifact));
    }

    /// Append a warning entry with no artifact.
    pub fn warning(&self, message: impl Into<String>) {
        self.log(StatusValue::Warning, message, None);
    }

    /// Record the unit's final outcome.
    pub fn mark(&self, outcome: UnitOutcome) {
        self.lock().outcome = outcome;
    }

    /// Current outcome.
    #[must_use]
    pub fn outcome(&self) -> UnitOutcome {
        self.lock().outcome
    }

    /// Copy of every entry logged so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    /// Snapshot suitable for rendering.
    #[must_use]
    pub fn record(&self) -> UnitRecord {
        let state = self.lock();
        UnitRecord {
            name: self.name.clone(),
            outcome: state.outcome,
            entries: state.entries.clone(),
        }
    }
}

/// Point-in-time copy of a unit, consumed by report writers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitRecord {
    name: String,
    outcome: UnitOutcome,
    entries: Vec<LogEntry>,
}

impl UnitRecord {
    /// Construct a record directly, mainly for writer tests.
    ///
    /// # Examples
    /// ```
    /// use unitscope::reporting::{UnitOutcome, UnitRecord};
    ///
    /// let record = UnitRecord::new("checkout", UnitOutcome::Passed, Vec::new());
    /// assert_eq!(record.name(), "checkout");
    /// assert_eq!(record.outcome().label(), "passed");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, outcome: UnitOutcome, entries: Vec<LogEntry>) -> Self {
        Self {
            name: name.into(),
            outcome,
            entries,
        }
    }

    /// Unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Outcome at snapshot time.
    #[must_use]
    pub fn outcome(&self) -> UnitOutcome {
        self.outcome
    }

    /// Entries at snapshot time.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries with [`StatusValue::Fail`].
    pub fn failures(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status().is_failure())
    }
}
