//! Worker-scoped resource registry.
//!
//! Each worker owns at most one expensive resource handle, such as a browser
//! session. The handle is created lazily by [`ResourceRegistry::init`],
//! reused for every unit the worker runs until [`ResourceRegistry::teardown`],
//! and never visible to other workers.
//!
//! Teardown removes the slot before calling [`ResourceHandle::release`], so
//! the slot is gone whether release succeeds, fails, or panics.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{CaptureError, ConfigError, ReleaseError, ResourceInitError};
use crate::panic::contain;
use crate::worker::{WorkerId, WorkerMap};

/// Window sizing applied while a resource is constructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Viewport {
    /// Fill the available display.
    #[default]
    Maximised,
    /// Fixed window dimensions in pixels.
    Fixed {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

impl FromStr for Viewport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_lowercase();
        if matches!(
            normalised.as_str(),
            "max" | "maximize" | "maximise" | "maximized" | "maximised"
        ) {
            return Ok(Self::Maximised);
        }
        let invalid = || ConfigError::Malformed {
            alias: crate::settings::GLOBAL_ALIAS.to_owned(),
            key: "viewport".to_owned(),
            reason: format!("'{value}' is neither 'maximized' nor WIDTHxHEIGHT"),
        };
        let (width, height) = normalised.split_once('x').ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::Fixed { width, height })
    }
}

/// A live, exclusively owned resource such as a browser session.
pub trait ResourceHandle: Send + Sync {
    /// Capture the resource's current view as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] when the resource cannot produce an image.
    fn capture_png(&self) -> Result<Vec<u8>, CaptureError>;

    /// Release the underlying resource. Called at most once per handle.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError`] when the resource does not shut down
    /// cleanly. Teardown logs the error and carries on.
    fn release(&self) -> Result<(), ReleaseError>;
}

/// Constructs resource handles on behalf of workers.
pub trait ResourceFactory: Send + Sync {
    /// Build a new handle sized according to `viewport`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceInitError`] when the resource cannot be created.
    fn create(&self, viewport: Viewport) -> Result<Box<dyn ResourceHandle>, ResourceInitError>;
}

impl<F: ResourceFactory + ?Sized> ResourceFactory for Box<F> {
    fn create(&self, viewport: Viewport) -> Result<Box<dyn ResourceHandle>, ResourceInitError> {
        (**self).create(viewport)
    }
}

/// Shared reference to a worker's live handle.
pub type SharedHandle = Arc<dyn ResourceHandle>;

/// Per-worker registry of resource handles.
pub struct ResourceRegistry {
    factory: Box<dyn ResourceFactory>,
    viewport: Viewport,
    slots: WorkerMap<SharedHandle>,
}

impl ResourceRegistry {
    /// Construct a registry that builds handles with `factory`.
    #[must_use]
    pub fn new(factory: impl ResourceFactory + 'static, viewport: Viewport) -> Self {
        Self {
            factory: Box::new(factory),
            viewport,
            slots: WorkerMap::new(),
        }
    }

    /// Ensure `worker` has a live handle, constructing one if needed.
    ///
    /// Calling `init` while a handle exists does nothing.
    ///
    /// # Errors
    ///
    /// Returns the factory's [`ResourceInitError`], or
    /// [`ResourceInitError::Panicked`] when the factory panics. The slot stays
    /// empty in both cases.
    pub fn init(&self, worker: WorkerId) -> Result<(), ResourceInitError> {
        if self.slots.contains(worker) {
            return Ok(());
        }
        let handle = contain(|| self.factory.create(self.viewport))
            .map_err(ResourceInitError::Panicked)??;
        self.slots.insert(worker, Arc::from(handle));
        log::debug!("created resource for worker {worker} ({:?})", self.viewport);
        Ok(())
    }

    /// The worker's live handle, if any. Never constructs one.
    #[must_use]
    pub fn get(&self, worker: WorkerId) -> Option<SharedHandle> {
        self.slots.get(worker)
    }

    /// Whether `worker` currently holds a live handle.
    #[must_use]
    pub fn is_initialized(&self, worker: WorkerId) -> bool {
        self.slots.contains(worker)
    }

    /// Release and forget the worker's handle.
    ///
    /// Release failures and panics are logged, never returned. A worker with
    /// no handle is a no-op.
    pub fn teardown(&self, worker: WorkerId) {
        let Some(handle) = self.slots.remove(worker) else {
            return;
        };
        match contain(|| handle.release()) {
            Ok(Ok(())) => log::debug!("released resource for worker {worker}"),
            Ok(Err(error)) => log::warn!("error releasing resource for worker {worker}: {error}"),
            Err(message) => {
                log::warn!("resource release panicked for worker {worker}: {message}");
            }
        }
    }

    /// Number of workers currently holding a handle.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("viewport", &self.viewport)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
