//! Error types surfaced by the lifecycle, reporting and capture layers.
//!
//! Only configuration, resource construction, report output and aggregated
//! soft assertions ever reach a caller. Capture failures are downgraded to
//! warnings by the logging pipeline and exist as values so the fallback chain
//! can inspect them.

use std::fmt;
use std::io;

use thiserror::Error;

/// Failures raised by a [`ConfigStore`](crate::config::ConfigStore).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested configuration group does not exist.
    #[error("unknown configuration alias '{0}'")]
    UnknownAlias(String),

    /// A value exists but cannot be interpreted.
    #[error("invalid value for {alias}.{key}: {reason}")]
    Malformed {
        /// Configuration group holding the value.
        alias: String,
        /// Key within the group.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Construction of a worker's resource handle failed.
#[derive(Debug, Error)]
pub enum ResourceInitError {
    /// The factory reported an error.
    #[error("resource construction failed: {0}")]
    Construction(String),

    /// The factory panicked while constructing the handle.
    #[error("resource factory panicked: {0}")]
    Panicked(String),
}

/// Releasing a resource handle failed. Never propagated past teardown.
#[derive(Debug, Error)]
#[error("resource release failed: {0}")]
pub struct ReleaseError(pub String);

/// A capture provider could not produce an artifact.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture backend reported an error.
    #[error("capture backend failed: {0}")]
    Backend(String),

    /// No display is available to capture.
    #[error("display capture is not supported in this environment")]
    Unsupported,

    /// The backend panicked mid-capture.
    #[error("capture panicked: {0}")]
    Panicked(String),

    /// The artifact could not be written to disk.
    #[error("failed to store screenshot: {0}")]
    Io(#[from] io::Error),
}

/// Report output could not be created or rendered.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Creating the report directory or writing the file failed.
    #[error("report I/O failed: {0}")]
    Io(#[from] io::Error),

    /// JSON serialisation failed.
    #[error("report serialisation failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Rendering into a text buffer failed.
    #[error("report rendering failed")]
    Render(#[from] fmt::Error),
}

/// The report sink was used before it was initialised.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("report sink used before initialisation")]
pub struct SinkInitOrderError;

/// Soft failures recorded during a unit, raised together at end-of-unit.
///
/// # Examples
///
/// ```
/// use unitscope::error::AggregatedAssertionError;
///
/// let error = AggregatedAssertionError::new(vec!["fail - a".into(), "fail - b".into()]);
/// let text = error.to_string();
/// assert!(text.find("fail - a") < text.find("fail - b"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedAssertionError {
    failures: Vec<String>,
}

impl AggregatedAssertionError {
    /// Wrap the recorded failure messages, preserving their order.
    #[must_use]
    pub fn new(failures: Vec<String>) -> Self {
        Self { failures }
    }

    /// Recorded messages in the order they were reported.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

impl fmt::Display for AggregatedAssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} soft assertion(s) failed", self.failures.len())?;
        for (position, failure) in self.failures.iter().enumerate() {
            write!(f, "\n\t{}. {failure}", position + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregatedAssertionError {}

/// Errors returned by the begin and end hooks.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The worker's resource could not be constructed; the unit never started.
    #[error("unit aborted before start: {0}")]
    ResourceInit(#[from] ResourceInitError),

    /// Soft failures recorded during the unit.
    #[error(transparent)]
    Assertions(#[from] AggregatedAssertionError),

    /// The report sink could not be created or flushed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Sink access before initialisation.
    #[error(transparent)]
    SinkInitOrder(#[from] SinkInitOrderError),
}
