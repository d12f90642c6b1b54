//! Process-wide report sink and per-worker unit handles.
//!
//! [`ReportSinkCell`] owns the one [`ReportSink`] of the process. The sink is
//! built lazily by the first begin-hook using double-checked locking: an
//! atomic flag is read without locking on the common path and re-read under
//! a mutex before the factory runs, so concurrent first calls build exactly
//! one sink. The cell also maps each worker to the [`UnitHandle`] of the unit
//! it is running.
//!
//! The sink keeps every unit it created and renders all of them through its
//! [`ReportWriter`] on each flush.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, OnceLock};

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::clock::file_stamp_now;
use crate::error::{ConfigError, ReportError, SinkInitOrderError};
use crate::worker::{WorkerId, WorkerMap};

/// JSON rendering of unit records.
pub mod json;
/// `JUnit` XML rendering of unit records.
pub mod junit;
mod unit;

pub use unit::{LogEntry, UnitHandle, UnitOutcome, UnitRecord};

static PROCESS_WIDE: LazyLock<Arc<ReportSinkCell>> =
    LazyLock::new(|| Arc::new(ReportSinkCell::new()));

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Output format of report files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Machine-readable JSON document.
    #[default]
    Json,
    /// `JUnit` XML test suite.
    Junit,
}

impl ReportFormat {
    /// File extension used for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Junit => "xml",
        }
    }

    /// Render `units` in this format.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] when serialisation fails.
    pub fn render(self, units: &[UnitRecord]) -> Result<String, ReportError> {
        match self {
            Self::Json => Ok(json::to_string(units)?),
            Self::Junit => {
                let mut output = String::new();
                junit::write(&mut output, units)?;
                Ok(output)
            }
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "junit" | "xml" => Ok(Self::Junit),
            _ => Err(ConfigError::Malformed {
                alias: crate::settings::GLOBAL_ALIAS.to_owned(),
                key: "reportFormat".to_owned(),
                reason: format!("unknown report format '{value}', expected json or junit"),
            }),
        }
    }
}

/// Where the report file lives: `<root>/<category>/<file name>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportLayout {
    root: Utf8PathBuf,
    category: String,
    file_name: String,
}

impl ReportLayout {
    /// Layout with an explicit file name.
    #[must_use]
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        category: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            category: category.into(),
            file_name: file_name.into(),
        }
    }

    /// Layout named `AutomationReport_<timestamp>.<ext>`.
    ///
    /// # Examples
    /// ```
    /// use unitscope::reporting::{ReportFormat, ReportLayout};
    ///
    /// let layout = ReportLayout::timestamped("/reports", "Smoke", ReportFormat::Junit);
    /// assert!(layout.path().as_str().starts_with("/reports/Smoke/AutomationReport_"));
    /// assert_eq!(layout.path().extension(), Some("xml"));
    /// ```
    #[must_use]
    pub fn timestamped(
        root: impl Into<Utf8PathBuf>,
        category: impl Into<String>,
        format: ReportFormat,
    ) -> Self {
        let file_name = format!("AutomationReport_{}.{}", file_stamp_now(), format.extension());
        Self::new(root, category, file_name)
    }

    /// Full path of the report file.
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.root.join(&self.category).join(&self.file_name)
    }

    /// Directory holding the report file.
    #[must_use]
    pub fn directory(&self) -> Utf8PathBuf {
        self.root.join(&self.category)
    }
}

/// Renders unit records somewhere durable.
///
/// Writers need not tolerate concurrent calls; [`ReportSink::flush`]
/// serialises them.
pub trait ReportWriter: Send + Sync {
    /// Write the full set of `units`, replacing any earlier output.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] when rendering or output fails.
    fn write(&self, units: &[UnitRecord]) -> Result<(), ReportError>;
}

/// [`ReportWriter`] that rewrites one file per flush.
#[derive(Debug)]
pub struct FileReportWriter {
    directory: Utf8PathBuf,
    file_name: String,
    format: ReportFormat,
}

impl FileReportWriter {
    /// Create the report directory and a writer targeting `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the directory cannot be created.
    pub fn create(layout: &ReportLayout, format: ReportFormat) -> Result<Self, ReportError> {
        let directory = layout.directory();
        Dir::create_ambient_dir_all(&directory, ambient_authority())?;
        Ok(Self {
            directory,
            file_name: layout.file_name.clone(),
            format,
        })
    }

    /// Path of the file this writer produces.
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.directory.join(&self.file_name)
    }
}

impl ReportWriter for FileReportWriter {
    fn write(&self, units: &[UnitRecord]) -> Result<(), ReportError> {
        let rendered = self.format.render(units)?;
        let dir = Dir::open_ambient_dir(&self.directory, ambient_authority())?;
        dir.write(&self.file_name, rendered)?;
        Ok(())
    }
}

/// The process-wide report: every unit created during the run.
pub struct ReportSink {
    writer: Box<dyn ReportWriter>,
    units: Mutex<Vec<Arc<UnitHandle>>>,
    flush_lock: Mutex<()>,
}

impl ReportSink {
    /// Wrap `writer`.
    #[must_use]
    pub fn new(writer: impl ReportWriter + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            units: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
        }
    }

    /// Sink writing `format` to the file described by `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the report directory cannot be
    /// created.
    pub fn to_file(layout: &ReportLayout, format: ReportFormat) -> Result<Self, ReportError> {
        Ok(Self::new(FileReportWriter::create(layout, format)?))
    }

    /// Register a fresh unit named `name`.
    #[must_use]
    pub fn create_unit(&self, name: impl Into<String>) -> Arc<UnitHandle> {
        let unit = Arc::new(UnitHandle::new(name));
        lock(&self.units).push(Arc::clone(&unit));
        unit
    }

    /// Snapshot of every registered unit in creation order.
    #[must_use]
    pub fn records(&self) -> Vec<UnitRecord> {
        let units = lock(&self.units).clone();
        units.iter().map(|unit| unit.record()).collect()
    }

    /// Render every registered unit through the writer.
    ///
    /// Flushes from different workers are serialised.
    ///
    /// # Errors
    ///
    /// Returns the writer's [`ReportError`].
    pub fn flush(&self) -> Result<(), ReportError> {
        let _serialised = lock(&self.flush_lock);
        self.writer.write(&self.records())
    }
}

impl fmt::Debug for ReportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportSink")
            .field("units", &lock(&self.units).len())
            .finish_non_exhaustive()
    }
}

/// Lazily initialised process-wide sink plus each worker's current unit.
pub struct ReportSinkCell {
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    sink: OnceLock<Arc<ReportSink>>,
    current: WorkerMap<Arc<UnitHandle>>,
}

impl ReportSinkCell {
    /// Construct an uninitialised cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            sink: OnceLock::new(),
            current: WorkerMap::new(),
        }
    }

    /// The cell shared by everything in this process.
    #[must_use]
    pub fn process_wide() -> Arc<Self> {
        Arc::clone(&PROCESS_WIDE)
    }

    /// Build the sink with `factory` unless it already exists.
    ///
    /// Concurrent first calls run `factory` exactly once. A failing factory
    /// leaves the cell uninitialised so a later call can retry.
    ///
    /// # Errors
    ///
    /// Returns the factory's [`ReportError`].
    pub fn ensure_initialized(
        &self,
        factory: impl FnOnce() -> Result<ReportSink, ReportError>,
    ) -> Result<(), ReportError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = lock(&self.init_lock);
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let sink = factory()?;
        // The flag and the cell only change together under init_lock.
        let _ = self.sink.set(Arc::new(sink));
        self.initialized.store(true, Ordering::Release);
        log::debug!("report sink initialised");
        Ok(())
    }

    /// Whether the sink has been built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The process-wide sink.
    ///
    /// # Errors
    ///
    /// Returns [`SinkInitOrderError`] before [`Self::ensure_initialized`]
    /// has succeeded.
    pub fn sink(&self) -> Result<Arc<ReportSink>, SinkInitOrderError> {
        if !self.is_initialized() {
            return Err(SinkInitOrderError);
        }
        self.sink.get().cloned().ok_or(SinkInitOrderError)
    }

    /// Make `unit` the worker's current unit, returning the previous one.
    pub fn set_current_unit(
        &self,
        worker: WorkerId,
        unit: Arc<UnitHandle>,
    ) -> Option<Arc<UnitHandle>> {
        self.current.insert(worker, unit)
    }

    /// The worker's current unit, if a unit is in flight.
    #[must_use]
    pub fn current_unit(&self, worker: WorkerId) -> Option<Arc<UnitHandle>> {
        self.current.get(worker)
    }

    /// Forget the worker's current unit.
    pub fn clear_current_unit(&self, worker: WorkerId) -> Option<Arc<UnitHandle>> {
        self.current.remove(worker)
    }

    /// Number of workers with a unit in flight.
    #[must_use]
    pub fn units_in_flight(&self) -> usize {
        self.current.len()
    }
}

impl Default for ReportSinkCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReportSinkCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportSinkCell")
            .field("initialized", &self.is_initialized())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
