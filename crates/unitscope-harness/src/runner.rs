//! Unit run requests, metadata and the descriptor handed to the hooks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use unitscope::UnitDescriptor;

/// Unit metadata provided to harness adapters.
///
/// # Examples
///
/// ```
/// use unitscope_harness::UnitMetadata;
///
/// let metadata = UnitMetadata::new(
///     "tests/features/login.feature",
///     "Successful login",
///     12,
///     vec!["@smoke".to_string()],
/// );
/// assert_eq!(metadata.source_path(), "tests/features/login.feature");
/// assert_eq!(metadata.unit_name(), "Successful login");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitMetadata {
    source_path: String,
    unit_name: String,
    line: u32,
    tags: Vec<String>,
}

impl UnitMetadata {
    /// Creates metadata for one unit run.
    #[must_use]
    pub fn new(
        source_path: impl Into<String>,
        unit_name: impl Into<String>,
        line: u32,
        tags: Vec<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            unit_name: unit_name.into(),
            line,
            tags,
        }
    }

    /// Returns the file that defines the unit.
    #[must_use]
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Returns the unit name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Returns the one-based line number in the source file.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns the unit tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Default for UnitMetadata {
    fn default() -> Self {
        Self::new("<unknown>", "<unknown>", 1, Vec::new())
    }
}

/// A unit while it runs: its metadata plus the state the hooks observe.
#[derive(Debug)]
pub struct RunningUnit {
    metadata: UnitMetadata,
    failed: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl RunningUnit {
    /// Wrap `metadata` for a fresh, passing run.
    #[must_use]
    pub fn new(metadata: UnitMetadata) -> Self {
        Self {
            metadata,
            failed: AtomicBool::new(false),
            log: Mutex::new(Vec::new()),
        }
    }

    fn lock_log(&self) -> MutexGuard<'_, Vec<String>> {
        match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Metadata of the unit.
    #[must_use]
    pub fn metadata(&self) -> &UnitMetadata {
        &self.metadata
    }

    /// Flag the unit as failed.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    /// Lines attached to the unit's log so far.
    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.lock_log().clone()
    }
}

impl UnitDescriptor for RunningUnit {
    fn name(&self) -> &str {
        self.metadata.unit_name()
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn attach_log(&self, line: &str) {
        self.lock_log().push(line.to_owned());
    }
}

/// A callable unit body owned by a harness.
///
/// # Examples
///
/// ```
/// use unitscope_harness::UnitRunner;
///
/// let runner = UnitRunner::new(|| 41 + 1);
/// assert_eq!(runner.run(), 42);
/// ```
pub struct UnitRunner<'a, T> {
    inner: Box<dyn FnOnce() -> T + 'a>,
}

impl<'a, T> UnitRunner<'a, T> {
    /// Wraps a closure as a unit runner.
    #[must_use]
    pub fn new(inner: impl FnOnce() -> T + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Executes the wrapped closure.
    #[must_use]
    pub fn run(self) -> T {
        (self.inner)()
    }
}

/// A harness execution request for one unit.
///
/// # Examples
///
/// ```
/// use unitscope_harness::{UnitMetadata, UnitRunRequest, UnitRunner};
///
/// let request = UnitRunRequest::new(
///     UnitMetadata::new("tests/features/auth.feature", "User signs in", 9, vec![]),
///     UnitRunner::new(|| "ok"),
/// );
/// assert_eq!(request.run(), "ok");
/// ```
pub struct UnitRunRequest<'a, T> {
    metadata: UnitMetadata,
    runner: UnitRunner<'a, T>,
}

impl<'a, T> UnitRunRequest<'a, T> {
    /// Creates a request from metadata and a runner.
    #[must_use]
    pub fn new(metadata: UnitMetadata, runner: UnitRunner<'a, T>) -> Self {
        Self { metadata, runner }
    }

    /// Returns immutable metadata for diagnostics or harness setup.
    #[must_use]
    pub fn metadata(&self) -> &UnitMetadata {
        &self.metadata
    }

    /// Consumes the request and returns metadata and runner separately.
    #[must_use]
    pub fn into_parts(self) -> (UnitMetadata, UnitRunner<'a, T>) {
        (self.metadata, self.runner)
    }

    /// Executes the runner directly.
    #[must_use]
    pub fn run(self) -> T {
        self.runner.run()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for unit metadata and runner primitives.

    use super::{RunningUnit, UnitMetadata, UnitRunRequest, UnitRunner};
    use std::cell::Cell;
    use std::rc::Rc;
    use unitscope::UnitDescriptor;

    #[test]
    fn metadata_default_is_unknown() {
        let metadata = UnitMetadata::default();
        assert_eq!(metadata.source_path(), "<unknown>");
        assert_eq!(metadata.unit_name(), "<unknown>");
        assert_eq!(metadata.line(), 1);
        assert!(metadata.tags().is_empty());
    }

    #[test]
    fn unit_runner_executes_closure() {
        let flag = Rc::new(Cell::new(false));
        let flag_clone = Rc::clone(&flag);
        let runner = UnitRunner::new(move || {
            flag_clone.set(true);
            7
        });
        assert_eq!(runner.run(), 7);
        assert!(flag.get());
    }

    #[test]
    fn request_exposes_metadata_and_runs() {
        let request = UnitRunRequest::new(
            UnitMetadata::new(
                "tests/features/auth.feature",
                "Login succeeds",
                17,
                vec!["@smoke".to_string(), "@fast".to_string()],
            ),
            UnitRunner::new(|| 11),
        );
        assert_eq!(request.metadata().unit_name(), "Login succeeds");
        assert_eq!(request.metadata().line(), 17);
        assert_eq!(request.run(), 11);
    }

    #[test]
    fn running_unit_describes_itself() {
        let unit = RunningUnit::new(UnitMetadata::new("a.feature", "Checkout", 3, vec![]));
        assert_eq!(unit.name(), "Checkout");
        assert!(!unit.is_failed());

        unit.attach_log("pass - opened");
        unit.mark_failed();

        assert!(unit.is_failed());
        assert_eq!(unit.log_lines(), ["pass - opened"]);
    }
}
