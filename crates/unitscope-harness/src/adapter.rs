//! Harness adapter trait for unit execution.

use crate::runner::UnitRunRequest;

/// Runs unit bodies inside a harness-specific environment.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use unitscope::UnitLifecycle;
/// use unitscope::reporting::ReportSink;
/// use unitscope::test_support::{FakeResourceFactory, MemoryReportWriter};
/// use unitscope_harness::{HarnessAdapter, LifecycleHarness, UnitMetadata, UnitRunRequest, UnitRunner};
///
/// let lifecycle = UnitLifecycle::builder(FakeResourceFactory::new())
///     .sink_factory(|| Ok(ReportSink::new(MemoryReportWriter::new())))
///     .build();
/// let harness = LifecycleHarness::new(Arc::new(lifecycle));
/// let request = UnitRunRequest::new(
///     UnitMetadata::new("tests/features/demo.feature", "Example", 3, vec![]),
///     UnitRunner::new(|| 5 + 5),
/// );
/// assert_eq!(harness.run(request), 10);
/// ```
pub trait HarnessAdapter {
    /// Executes one unit request and returns the runner result.
    fn run<T>(&self, request: UnitRunRequest<'_, T>) -> T;
}
