//! The logging pipeline behind every step log.
//!
//! One call maps the status text, tries each capture provider in order until
//! one yields a screenshot, writes the entry to the worker's current unit,
//! echoes it into the unit's own scenario log and records a soft failure for
//! `fail` statuses. Every provider that comes back empty-handed leaves one
//! warning on the unit. Nothing a collaborator does can make `log` panic.

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::assertions::AssertionAggregator;
use crate::capture::{CaptureOutcome, CaptureProvider};
use crate::lifecycle::ScenarioContexts;
use crate::panic::contain;
use crate::reporting::{ReportSinkCell, UnitHandle};
use crate::status::StatusValue;
use crate::worker::WorkerId;

/// Routes step logs to reports, scenario logs and the assertion aggregator.
pub struct LoggingPipeline {
    cell: Arc<ReportSinkCell>,
    contexts: Arc<ScenarioContexts>,
    aggregator: Arc<AssertionAggregator>,
    providers: Vec<Box<dyn CaptureProvider>>,
}

impl LoggingPipeline {
    /// Pipeline with no capture providers.
    #[must_use]
    pub fn new(
        cell: Arc<ReportSinkCell>,
        contexts: Arc<ScenarioContexts>,
        aggregator: Arc<AssertionAggregator>,
    ) -> Self {
        Self {
            cell,
            contexts,
            aggregator,
            providers: Vec::new(),
        }
    }

    /// Append a capture provider. Providers are tried in insertion order.
    #[must_use]
    pub fn with_provider(mut self, provider: impl CaptureProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Log a step for the calling worker, attaching a screenshot when one
    /// can be taken.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use unitscope::assertions::AssertionAggregator;
    /// use unitscope::lifecycle::ScenarioContexts;
    /// use unitscope::pipeline::LoggingPipeline;
    /// use unitscope::reporting::ReportSinkCell;
    ///
    /// let pipeline = LoggingPipeline::new(
    ///     Arc::new(ReportSinkCell::new()),
    ///     Arc::new(ScenarioContexts::new()),
    ///     Arc::new(AssertionAggregator::new()),
    /// );
    /// // No unit is in flight: the call is a quiet no-op.
    /// pipeline.log("fail", "heading missing");
    /// ```
    pub fn log(&self, status: &str, description: &str) {
        self.log_as(WorkerId::current(), status, description);
    }

    /// [`Self::log`] on behalf of `worker`.
    pub fn log_as(&self, worker: WorkerId, status: &str, description: &str) {
        self.guarded(worker, || self.record(worker, status, description, true));
    }

    /// Log a step for the calling worker without attempting a capture.
    pub fn log_text(&self, status: &str, description: &str) {
        self.log_text_as(WorkerId::current(), status, description);
    }

    /// [`Self::log_text`] on behalf of `worker`.
    pub fn log_text_as(&self, worker: WorkerId, status: &str, description: &str) {
        self.guarded(worker, || self.record(worker, status, description, false));
    }

    fn guarded(&self, worker: WorkerId, call: impl FnOnce()) {
        let Err(message) = contain(call) else {
            return;
        };
        log::warn!("logger failed for worker {worker}: {message}");
        if let Some(unit) = self.cell.current_unit(worker) {
            unit.warning(format!("logger failed: {message}"));
        }
    }

    fn record(&self, worker: WorkerId, status_text: &str, description: &str, capture: bool) {
        let status = StatusValue::from_text(status_text);
        let unit = self.cell.current_unit(worker);
        let artifact = if capture {
            self.capture(worker, unit.as_deref())
        } else {
            None
        };
        if let Some(unit) = &unit {
            unit.log(status, description, artifact);
        }

        let line = format!("{status_text} - {description}");
        let context = self.contexts.get(worker);
        if let Some(context) = &context {
            context.attach_log(&line);
        }
        if status.is_failure() && (context.is_some() || unit.is_some()) {
            self.aggregator.record_failure(worker, line);
        }
    }

    fn capture(&self, worker: WorkerId, unit: Option<&UnitHandle>) -> Option<Utf8PathBuf> {
        for provider in &self.providers {
            let outcome = match provider.produce(worker) {
                CaptureOutcome::Captured(path) => return Some(path),
                other => other,
            };
            let warning = format!("{} screenshot unavailable: {outcome}", provider.label());
            log::warn!("worker {worker}: {warning}");
            if let Some(unit) = unit {
                unit.warning(warning);
            }
        }
        None
    }
}

impl fmt::Debug for LoggingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self.providers.iter().map(|p| p.label()).collect();
        f.debug_struct("LoggingPipeline")
            .field("providers", &labels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{AmbientCapture, ResourceBoundCapture, ScreenshotStore};
    use crate::lifecycle::UnitDescriptor;
    use crate::reporting::ReportSink;
    use crate::resource::{ResourceRegistry, Viewport};
    use crate::test_support::{
        Behaviour, FakeDisplay, FakeResourceFactory, MemoryReportWriter, TestUnit,
    };
    use camino::Utf8Path;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const WORKER: WorkerId = WorkerId::new(21);

    struct Rig {
        pipeline: LoggingPipeline,
        cell: Arc<ReportSinkCell>,
        contexts: Arc<ScenarioContexts>,
        aggregator: Arc<AssertionAggregator>,
        registry: Arc<ResourceRegistry>,
        _temp: TempDir,
    }

    impl Rig {
        fn new(capture: Behaviour, display: Behaviour) -> Self {
            let Ok(temp) = tempfile::tempdir() else {
                panic!("temporary directory should be available");
            };
            let Some(root) = Utf8Path::from_path(temp.path()) else {
                panic!("temporary directory should be UTF-8");
            };
            let store = ScreenshotStore::new(root);
            let cell = Arc::new(ReportSinkCell::new());
            let contexts = Arc::new(ScenarioContexts::new());
            let aggregator = Arc::new(AssertionAggregator::new());
            let registry = Arc::new(ResourceRegistry::new(
                FakeResourceFactory::new().capturing(capture),
                Viewport::Maximised,
            ));
            let pipeline = LoggingPipeline::new(
                Arc::clone(&cell),
                Arc::clone(&contexts),
                Arc::clone(&aggregator),
            )
            .with_provider(ResourceBoundCapture::new(
                Arc::clone(&registry),
                store.clone(),
            ))
            .with_provider(AmbientCapture::new(FakeDisplay::new(display), store));
            Self {
                pipeline,
                cell,
                contexts,
                aggregator,
                registry,
                _temp: temp,
            }
        }

        fn start(&self, unit: &Arc<TestUnit>) -> Arc<UnitHandle> {
            assert!(
                self.cell
                    .ensure_initialized(|| Ok(ReportSink::new(MemoryReportWriter::new())))
                    .is_ok()
            );
            let Ok(sink) = self.cell.sink() else {
                panic!("sink should be initialised");
            };
            let handle = sink.create_unit(unit.name());
            self.cell.set_current_unit(WORKER, Arc::clone(&handle));
            let descriptor: Arc<dyn UnitDescriptor> = unit.clone();
            self.contexts.insert(WORKER, descriptor);
            assert!(self.registry.init(WORKER).is_ok());
            handle
        }
    }

    #[fixture]
    fn unit() -> Arc<TestUnit> {
        Arc::new(TestUnit::new("checkout"))
    }

    fn warnings(handle: &UnitHandle) -> usize {
        handle
            .entries()
            .iter()
            .filter(|entry| entry.status() == StatusValue::Warning)
            .count()
    }

    #[rstest]
    fn bound_capture_is_preferred(unit: Arc<TestUnit>) {
        let rig = Rig::new(Behaviour::Succeed, Behaviour::Succeed);
        let handle = rig.start(&unit);

        rig.pipeline.log_as(WORKER, "pass", "cart opened");

        let entries = handle.entries();
        let [entry] = entries.as_slice() else {
            panic!("exactly one entry expected, got {entries:?}");
        };
        assert_eq!(entry.status(), StatusValue::Pass);
        assert!(entry.artifact().is_some_and(|path| path.as_str().contains("Resource_")));
    }

    #[rstest]
    fn failed_bound_capture_falls_back_with_one_warning(unit: Arc<TestUnit>) {
        let rig = Rig::new(Behaviour::Fail, Behaviour::Succeed);
        let handle = rig.start(&unit);

        rig.pipeline.log_as(WORKER, "info", "opened page");

        assert_eq!(warnings(&handle), 1);
        let entries = handle.entries();
        let Some(logged) = entries.last() else {
            panic!("entry expected");
        };
        assert_eq!(logged.status(), StatusValue::Info);
        assert!(logged.artifact().is_some_and(|path| path.as_str().contains("Desktop_")));
    }

    #[rstest]
    fn both_providers_failing_leaves_a_warning_each(unit: Arc<TestUnit>) {
        let rig = Rig::new(Behaviour::Panic, Behaviour::Fail);
        let handle = rig.start(&unit);

        rig.pipeline.log_as(WORKER, "info", "slow page");

        let entries = handle.entries();
        let capture_warnings: Vec<_> = entries
            .iter()
            .filter(|entry| entry.description().contains("screenshot unavailable"))
            .collect();
        assert_eq!(capture_warnings.len(), 2);
        assert!(capture_warnings.iter().all(|entry| entry.status() == StatusValue::Warning));
        assert!(capture_warnings.first().is_some_and(|entry| entry.description().starts_with("Resource")));
        assert!(capture_warnings.last().is_some_and(|entry| entry.description().starts_with("Desktop")));
        assert!(entries.last().is_some_and(|entry| entry.status() == StatusValue::Info));
        assert!(entries.iter().all(|entry| entry.artifact().is_none()));
    }

    #[rstest]
    fn fail_status_is_recorded_everywhere(unit: Arc<TestUnit>) {
        let rig = Rig::new(Behaviour::Succeed, Behaviour::Succeed);
        rig.start(&unit);

        rig.pipeline.log_as(WORKER, "fatal", "total wrong");

        assert_eq!(unit.lines(), ["fatal - total wrong"]);
        assert_eq!(rig.aggregator.pending(WORKER), ["fatal - total wrong"]);
    }

    #[rstest]
    fn log_text_skips_capture(unit: Arc<TestUnit>) {
        let rig = Rig::new(Behaviour::Succeed, Behaviour::Succeed);
        let handle = rig.start(&unit);

        rig.pipeline.log_text_as(WORKER, "pass", "no screenshot");

        let entries = handle.entries();
        let [entry] = entries.as_slice() else {
            panic!("exactly one entry expected");
        };
        assert!(entry.artifact().is_none());
        assert_eq!(unit.lines(), ["pass - no screenshot"]);
    }

    #[test]
    fn logging_without_a_unit_is_harmless() {
        let rig = Rig::new(Behaviour::Panic, Behaviour::Panic);

        rig.pipeline.log_as(WORKER, "fail", "x");

        assert!(rig.aggregator.pending(WORKER).is_empty());
        assert!(!rig.aggregator.tracks(WORKER));
        assert!(rig.cell.current_unit(WORKER).is_none());
    }

    struct ExplodingUnit;

    impl UnitDescriptor for ExplodingUnit {
        fn name(&self) -> &str {
            "exploding"
        }

        fn is_failed(&self) -> bool {
            false
        }

        fn attach_log(&self, _line: &str) {
            panic!("scenario log closed");
        }
    }

    #[test]
    fn descriptor_panics_become_warnings() {
        let rig = Rig::new(Behaviour::Succeed, Behaviour::Succeed);
        let unit = Arc::new(TestUnit::new("exploding"));
        let handle = rig.start(&unit);
        rig.contexts.insert(WORKER, Arc::new(ExplodingUnit));

        rig.pipeline.log_text_as(WORKER, "pass", "step");

        let entries = handle.entries();
        assert!(entries.iter().any(|entry| {
            entry.status() == StatusValue::Warning
                && entry.description() == "logger failed: scenario log closed"
        }));
    }
}
