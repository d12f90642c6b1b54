//! Screenshot files on disk.

use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::clock::file_stamp_now;
use crate::error::CaptureError;
use crate::worker::WorkerId;

const SCREENSHOT_DIRECTORY: &str = "AutomationReportScreenshots";

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Writes captured PNGs below a root directory.
///
/// Files land at
/// `<root>/AutomationReportScreenshots/<timestamp>_<worker>/<Label>_<timestamp>_<seq>.png`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenshotStore {
    root: Utf8PathBuf,
}

impl ScreenshotStore {
    /// Store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Persist `png` for `worker` and return the file path.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Io`] when the directory or file cannot be
    /// written.
    pub fn store(
        &self,
        worker: WorkerId,
        label: &str,
        png: &[u8],
    ) -> Result<Utf8PathBuf, CaptureError> {
        let stamp = file_stamp_now();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let directory = self
            .root
            .join(SCREENSHOT_DIRECTORY)
            .join(format!("{stamp}_{worker}"));
        let file_name = format!("{label}_{stamp}_{sequence}.png");

        Dir::create_ambient_dir_all(&directory, ambient_authority())?;
        let dir = Dir::open_ambient_dir(&directory, ambient_authority())?;
        dir.write(&file_name, png)?;
        Ok(directory.join(file_name))
    }
}
