//! Fakes for exercising the lifecycle without real resources.
//!
//! Enabled for this crate's unit tests and, through the `test-support`
//! feature, for behaviour tests here and in `unitscope-harness`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::capture::DisplayGrabber;
use crate::error::{CaptureError, ReleaseError, ReportError, ResourceInitError};
use crate::lifecycle::UnitDescriptor;
use crate::reporting::{ReportWriter, UnitRecord};
use crate::resource::{ResourceFactory, ResourceHandle, Viewport};

/// Minimal valid PNG signature, enough for tests that only check files.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// How a fake collaborator responds when called.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Behaviour {
    /// Return successfully.
    #[default]
    Succeed,
    /// Return an error.
    Fail,
    /// Panic.
    Panic,
}

/// Counters shared between a [`FakeResourceFactory`] and its handles.
#[derive(Debug, Default)]
pub struct FakeResourceState {
    created: AtomicUsize,
    release_attempts: AtomicUsize,
    captures: AtomicUsize,
    last_viewport: Mutex<Option<Viewport>>,
}

impl FakeResourceState {
    /// Handles constructed so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Calls to [`ResourceHandle::release`] so far.
    #[must_use]
    pub fn release_attempts(&self) -> usize {
        self.release_attempts.load(Ordering::SeqCst)
    }

    /// Calls to [`ResourceHandle::capture_png`] so far.
    #[must_use]
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Viewport passed to the most recent construction.
    #[must_use]
    pub fn last_viewport(&self) -> Option<Viewport> {
        *lock(&self.last_viewport)
    }
}

/// Scriptable [`ResourceFactory`].
#[derive(Debug, Default)]
pub struct FakeResourceFactory {
    create: Behaviour,
    capture: Behaviour,
    release: Behaviour,
    state: Arc<FakeResourceState>,
}

impl FakeResourceFactory {
    /// Factory whose handles succeed at everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how construction behaves.
    #[must_use]
    pub fn creating(mut self, behaviour: Behaviour) -> Self {
        self.create = behaviour;
        self
    }

    /// Set how handles capture.
    #[must_use]
    pub fn capturing(mut self, behaviour: Behaviour) -> Self {
        self.capture = behaviour;
        self
    }

    /// Set how handles release.
    #[must_use]
    pub fn releasing(mut self, behaviour: Behaviour) -> Self {
        self.release = behaviour;
        self
    }

    /// Shared counters, readable after the factory has been moved.
    #[must_use]
    pub fn state(&self) -> Arc<FakeResourceState> {
        Arc::clone(&self.state)
    }
}

impl ResourceFactory for FakeResourceFactory {
    fn create(&self, viewport: Viewport) -> Result<Box<dyn ResourceHandle>, ResourceInitError> {
        *lock(&self.state.last_viewport) = Some(viewport);
        match self.create {
            Behaviour::Succeed => {
                self.state.created.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeResource {
                    capture: self.capture,
                    release: self.release,
                    state: Arc::clone(&self.state),
                }))
            }
            Behaviour::Fail => Err(ResourceInitError::Construction(
                "fake resource refused to start".to_owned(),
            )),
            Behaviour::Panic => panic!("fake resource factory panicked"),
        }
    }
}

struct FakeResource {
    capture: Behaviour,
    release: Behaviour,
    state: Arc<FakeResourceState>,
}

impl ResourceHandle for FakeResource {
    fn capture_png(&self) -> Result<Vec<u8>, CaptureError> {
        self.state.captures.fetch_add(1, Ordering::SeqCst);
        match self.capture {
            Behaviour::Succeed => Ok(FAKE_PNG.to_vec()),
            Behaviour::Fail => Err(CaptureError::Backend("fake session lost".to_owned())),
            Behaviour::Panic => panic!("fake resource capture panicked"),
        }
    }

    fn release(&self) -> Result<(), ReleaseError> {
        self.state.release_attempts.fetch_add(1, Ordering::SeqCst);
        match self.release {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => Err(ReleaseError("fake resource would not quit".to_owned())),
            Behaviour::Panic => panic!("fake resource release panicked"),
        }
    }
}

/// Number of grabs made by a [`FakeDisplay`].
#[derive(Clone, Debug, Default)]
pub struct GrabCounter(Arc<AtomicUsize>);

impl GrabCounter {
    /// Grabs so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scriptable [`DisplayGrabber`].
#[derive(Debug)]
pub struct FakeDisplay {
    behaviour: Behaviour,
    grabs: GrabCounter,
}

impl FakeDisplay {
    /// Display that responds with `behaviour`.
    #[must_use]
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            grabs: GrabCounter::default(),
        }
    }

    /// Counter shared with the display.
    #[must_use]
    pub fn grabs(&self) -> GrabCounter {
        self.grabs.clone()
    }
}

impl DisplayGrabber for FakeDisplay {
    fn grab_png(&self) -> Result<Vec<u8>, CaptureError> {
        self.grabs.0.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Succeed => Ok(FAKE_PNG.to_vec()),
            Behaviour::Fail => Err(CaptureError::Backend("fake display is off".to_owned())),
            Behaviour::Panic => panic!("fake display panicked"),
        }
    }
}

#[derive(Debug, Default)]
struct WriterLog {
    writes: usize,
    last: Option<Vec<UnitRecord>>,
}

/// [`ReportWriter`] that keeps the last rendered records in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryReportWriter {
    log: Arc<Mutex<WriterLog>>,
    failing: Arc<AtomicBool>,
}

impl MemoryReportWriter {
    /// Empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        lock(&self.log).writes
    }

    /// Records passed to the most recent successful write.
    #[must_use]
    pub fn last(&self) -> Option<Vec<UnitRecord>> {
        lock(&self.log).last.clone()
    }
}

impl ReportWriter for MemoryReportWriter {
    fn write(&self, units: &[UnitRecord]) -> Result<(), ReportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::Io(std::io::Error::other("fake report disk full")));
        }
        let mut log = lock(&self.log);
        log.writes += 1;
        log.last = Some(units.to_vec());
        Ok(())
    }
}

/// In-memory [`UnitDescriptor`].
#[derive(Debug, Default)]
pub struct TestUnit {
    name: String,
    failed: AtomicBool,
    lines: Mutex<Vec<String>>,
}

impl TestUnit {
    /// Passing unit named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Flag the unit as failed.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    /// Lines attached through [`UnitDescriptor::attach_log`].
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl UnitDescriptor for TestUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn attach_log(&self, line: &str) {
        lock(&self.lines).push(line.to_owned());
    }
}
