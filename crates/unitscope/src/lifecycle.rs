//! Begin and end hooks for one unit of work.
//!
//! [`UnitLifecycle`] wires the registry, report sink, aggregator and logging
//! pipeline together. A runner calls [`UnitLifecycle::on_unit_start`] before
//! each unit body and [`UnitLifecycle::on_unit_end`] afterwards, on the same
//! worker. Between the two calls the worker has a live resource, a current
//! unit handle and a scenario context; after the end-hook it has none of
//! them.

use std::fmt;
use std::sync::Arc;

use crate::assertions::AssertionAggregator;
use crate::capture::{
    AmbientCapture, DisplayGrabber, HeadlessDisplay, ResourceBoundCapture, ScreenshotStore,
};
use crate::error::{LifecycleError, ReportError};
use crate::pipeline::LoggingPipeline;
use crate::reporting::{ReportLayout, ReportSink, ReportSinkCell, UnitHandle, UnitOutcome};
use crate::resource::{ResourceFactory, ResourceRegistry};
use crate::settings::HarnessSettings;
use crate::status::StatusValue;
use crate::worker::{WorkerId, WorkerMap};

/// The runner's view of a unit.
pub trait UnitDescriptor: Send + Sync {
    /// Display name, used as the report entry name.
    fn name(&self) -> &str;

    /// Whether the runner considers the unit failed.
    fn is_failed(&self) -> bool;

    /// Append `line` to the unit's own log.
    fn attach_log(&self, line: &str);
}

/// Each worker's in-flight unit descriptor.
pub type ScenarioContexts = WorkerMap<Arc<dyn UnitDescriptor>>;

type SinkFactory = dyn Fn() -> Result<ReportSink, ReportError> + Send + Sync;

/// Configures a [`UnitLifecycle`].
pub struct UnitLifecycleBuilder {
    factory: Box<dyn ResourceFactory>,
    settings: HarnessSettings,
    grabber: Box<dyn DisplayGrabber>,
    cell: Option<Arc<ReportSinkCell>>,
    sink_factory: Option<Box<SinkFactory>>,
}

impl UnitLifecycleBuilder {
    /// Use `settings` instead of [`HarnessSettings::default`].
    #[must_use]
    pub fn settings(mut self, settings: HarnessSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `grabber` for full-display captures. Defaults to
    /// [`HeadlessDisplay`].
    #[must_use]
    pub fn display(mut self, grabber: impl DisplayGrabber + 'static) -> Self {
        self.grabber = Box::new(grabber);
        self
    }

    /// Share `cell` instead of creating a private one.
    #[must_use]
    pub fn report_cell(mut self, cell: Arc<ReportSinkCell>) -> Self {
        self.cell = Some(cell);
        self
    }

    /// Build the sink with `factory` instead of writing a timestamped report
    /// file below the configured report root.
    #[must_use]
    pub fn sink_factory(
        mut self,
        factory: impl Fn() -> Result<ReportSink, ReportError> + Send + Sync + 'static,
    ) -> Self {
        self.sink_factory = Some(Box::new(factory));
        self
    }

    /// Assemble the lifecycle.
    #[must_use]
    pub fn build(self) -> UnitLifecycle {
        let Self {
            factory,
            settings,
            grabber,
            cell,
            sink_factory,
        } = self;
        let cell = cell.unwrap_or_default();
        let contexts = Arc::new(ScenarioContexts::new());
        let aggregator = Arc::new(AssertionAggregator::new());
        let registry = Arc::new(ResourceRegistry::new(factory, settings.viewport));
        let store = ScreenshotStore::new(settings.screenshot_root.clone());
        let pipeline = LoggingPipeline::new(
            Arc::clone(&cell),
            Arc::clone(&contexts),
            Arc::clone(&aggregator),
        )
        .with_provider(ResourceBoundCapture::new(
            Arc::clone(&registry),
            store.clone(),
        ))
        .with_provider(AmbientCapture::new(grabber, store));
        let sink_factory = sink_factory.unwrap_or_else(|| file_sink_factory(&settings));
        UnitLifecycle {
            settings,
            cell,
            contexts,
            aggregator,
            registry,
            pipeline,
            sink_factory,
        }
    }
}

fn file_sink_factory(settings: &HarnessSettings) -> Box<SinkFactory> {
    let root = settings.report_root.clone();
    let category = settings.report_category.clone();
    let format = settings.report_format;
    Box::new(move || {
        let layout = ReportLayout::timestamped(root.clone(), category.clone(), format);
        log::debug!("writing report to {}", layout.path());
        ReportSink::to_file(&layout, format)
    })
}

/// Per-unit begin and end hooks shared by every worker.
pub struct UnitLifecycle {
    settings: HarnessSettings,
    cell: Arc<ReportSinkCell>,
    contexts: Arc<ScenarioContexts>,
    aggregator: Arc<AssertionAggregator>,
    registry: Arc<ResourceRegistry>,
    pipeline: LoggingPipeline,
    sink_factory: Box<SinkFactory>,
}

impl UnitLifecycle {
    /// Start configuring a lifecycle whose resources come from `factory`.
    #[must_use]
    pub fn builder(factory: impl ResourceFactory + 'static) -> UnitLifecycleBuilder {
        UnitLifecycleBuilder {
            factory: Box::new(factory),
            settings: HarnessSettings::default(),
            grabber: Box::new(HeadlessDisplay),
            cell: None,
            sink_factory: None,
        }
    }

    /// Begin-hook for the calling worker.
    ///
    /// # Errors
    ///
    /// See [`Self::on_unit_start_as`].
    pub fn on_unit_start(&self, unit: Arc<dyn UnitDescriptor>) -> Result<(), LifecycleError> {
        self.on_unit_start_as(WorkerId::current(), unit)
    }

    /// Begin-hook for `worker`.
    ///
    /// Initialises the report sink on first use, registers a unit handle,
    /// stores the scenario context and makes sure the worker has a resource.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Report`] when the sink cannot be created and
    /// [`LifecycleError::ResourceInit`] when the resource cannot be. In the
    /// latter case the unit's report entry records that it was aborted.
    pub fn on_unit_start_as(
        &self,
        worker: WorkerId,
        unit: Arc<dyn UnitDescriptor>,
    ) -> Result<(), LifecycleError> {
        self.cell.ensure_initialized(|| (self.sink_factory)())?;
        let sink = self.cell.sink()?;
        let handle = sink.create_unit(unit.name());
        if let Some(stale) = self.cell.set_current_unit(worker, Arc::clone(&handle)) {
            log::warn!(
                "worker {worker} started '{}' while '{}' had not ended",
                handle.name(),
                stale.name()
            );
        }
        self.aggregator.clear(worker);
        self.contexts.insert(worker, unit);

        if let Err(error) = self.registry.init(worker) {
            handle.log(
                StatusValue::Fail,
                format!("unit aborted before start: {error}"),
                None,
            );
            handle.mark(UnitOutcome::Failed);
            return Err(error.into());
        }
        log::debug!("worker {worker} started '{}'", handle.name());
        Ok(())
    }

    /// End-hook for the calling worker.
    ///
    /// # Errors
    ///
    /// See [`Self::on_unit_end_as`].
    pub fn on_unit_end(&self, unit: &dyn UnitDescriptor) -> Result<(), LifecycleError> {
        self.on_unit_end_as(WorkerId::current(), unit)
    }

    /// End-hook for `worker`.
    ///
    /// Marks the unit, flushes soft assertions, releases the resource, drops
    /// every worker-local entry and rewrites the report. All steps run even
    /// when an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Assertions`] when soft failures were
    /// recorded, otherwise any report error. A report error that coincides
    /// with soft failures is logged instead of returned.
    pub fn on_unit_end_as(
        &self,
        worker: WorkerId,
        unit: &dyn UnitDescriptor,
    ) -> Result<(), LifecycleError> {
        let handle = self.cell.current_unit(worker);
        let assertions = self.aggregator.flush_all(worker);
        if let Some(handle) = &handle {
            let aborted = handle.outcome() == UnitOutcome::Failed;
            mark(handle, aborted || unit.is_failed() || assertions.is_err());
        }

        self.registry.teardown(worker);
        self.aggregator.clear(worker);
        self.contexts.remove(worker);
        self.cell.clear_current_unit(worker);

        let flushed = self
            .cell
            .sink()
            .map_err(LifecycleError::from)
            .and_then(|sink| sink.flush().map_err(LifecycleError::from));
        log::debug!("worker {worker} ended '{}'", unit.name());

        match (assertions, flushed) {
            (Err(soft), Err(report)) => {
                log::warn!("report flush failed for worker {worker}: {report}");
                Err(soft.into())
            }
            (Err(soft), Ok(())) => Err(soft.into()),
            (Ok(()), flushed) => flushed,
        }
    }

    /// Pipeline for step logs.
    #[must_use]
    pub fn pipeline(&self) -> &LoggingPipeline {
        &self.pipeline
    }

    /// Resource registry.
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Soft assertion aggregator.
    #[must_use]
    pub fn aggregator(&self) -> &AssertionAggregator {
        &self.aggregator
    }

    /// Report sink cell.
    #[must_use]
    pub fn report_cell(&self) -> &Arc<ReportSinkCell> {
        &self.cell
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Whether `worker` has a scenario context.
    #[must_use]
    pub fn has_context(&self, worker: WorkerId) -> bool {
        self.contexts.contains(worker)
    }
}

fn mark(handle: &UnitHandle, failed: bool) {
    handle.mark(if failed {
        UnitOutcome::Failed
    } else {
        UnitOutcome::Passed
    });
}

impl fmt::Debug for UnitLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitLifecycle")
            .field("settings", &self.settings)
            .field("cell", &self.cell)
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
