//! Screenshot providers used by the logging pipeline.
//!
//! A provider never fails loudly. [`CaptureProvider::produce`] folds every
//! outcome, including backend panics, into a [`CaptureOutcome`] so the
//! pipeline can decide whether to fall back to the next provider.

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::error::CaptureError;
use crate::panic::contain;
use crate::resource::ResourceRegistry;
use crate::worker::WorkerId;

mod store;

pub use store::ScreenshotStore;

/// Result of one capture attempt.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The screenshot was written to this path.
    Captured(Utf8PathBuf),
    /// Nothing to capture. Not an error.
    NoArtifact(String),
    /// The backend or the store failed.
    Failed(CaptureError),
}

impl CaptureOutcome {
    /// The artifact path when one was captured.
    #[must_use]
    pub fn into_artifact(self) -> Option<Utf8PathBuf> {
        match self {
            Self::Captured(path) => Some(path),
            Self::NoArtifact(_) | Self::Failed(_) => None,
        }
    }
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captured(path) => write!(f, "captured {path}"),
            Self::NoArtifact(reason) => write!(f, "no artifact: {reason}"),
            Self::Failed(error) => write!(f, "{error}"),
        }
    }
}

/// Something that can produce a screenshot for a worker.
pub trait CaptureProvider: Send + Sync {
    /// Short name used in file names and warnings.
    fn label(&self) -> &'static str;

    /// Attempt a capture on behalf of `worker`.
    fn produce(&self, worker: WorkerId) -> CaptureOutcome;
}

fn persist(
    store: &ScreenshotStore,
    worker: WorkerId,
    label: &str,
    grabbed: Result<Result<Vec<u8>, CaptureError>, String>,
) -> CaptureOutcome {
    let png = match grabbed {
        Ok(Ok(png)) => png,
        Ok(Err(error)) => return CaptureOutcome::Failed(error),
        Err(message) => return CaptureOutcome::Failed(CaptureError::Panicked(message)),
    };
    match store.store(worker, label, &png) {
        Ok(path) => CaptureOutcome::Captured(path),
        Err(error) => CaptureOutcome::Failed(error),
    }
}

/// Captures through the worker's own resource handle.
#[derive(Debug)]
pub struct ResourceBoundCapture {
    registry: Arc<ResourceRegistry>,
    store: ScreenshotStore,
}

impl ResourceBoundCapture {
    /// Capture via handles held in `registry`.
    #[must_use]
    pub fn new(registry: Arc<ResourceRegistry>, store: ScreenshotStore) -> Self {
        Self { registry, store }
    }
}

impl CaptureProvider for ResourceBoundCapture {
    fn label(&self) -> &'static str {
        "Resource"
    }

    fn produce(&self, worker: WorkerId) -> CaptureOutcome {
        let Some(handle) = self.registry.get(worker) else {
            return CaptureOutcome::NoArtifact(format!("worker {worker} holds no resource"));
        };
        persist(
            &self.store,
            worker,
            self.label(),
            contain(|| handle.capture_png()),
        )
    }
}

/// Backend producing a PNG of the whole display.
pub trait DisplayGrabber: Send + Sync {
    /// Grab the display.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] when no image can be produced.
    fn grab_png(&self) -> Result<Vec<u8>, CaptureError>;
}

impl<G: DisplayGrabber + ?Sized> DisplayGrabber for Box<G> {
    fn grab_png(&self) -> Result<Vec<u8>, CaptureError> {
        (**self).grab_png()
    }
}

/// Grabber for machines without a display.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessDisplay;

impl DisplayGrabber for HeadlessDisplay {
    fn grab_png(&self) -> Result<Vec<u8>, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

/// Captures the full display, independent of any worker resource.
pub struct AmbientCapture {
    grabber: Box<dyn DisplayGrabber>,
    store: ScreenshotStore,
}

impl AmbientCapture {
    /// Capture with `grabber`, writing into `store`.
    #[must_use]
    pub fn new(grabber: impl DisplayGrabber + 'static, store: ScreenshotStore) -> Self {
        Self {
            grabber: Box::new(grabber),
            store,
        }
    }
}

impl CaptureProvider for AmbientCapture {
    fn label(&self) -> &'static str {
        "Desktop"
    }

    fn produce(&self, worker: WorkerId) -> CaptureOutcome {
        persist(
            &self.store,
            worker,
            self.label(),
            contain(|| self.grabber.grab_png()),
        )
    }
}

impl fmt::Debug for AmbientCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientCapture")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
