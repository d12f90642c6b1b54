//! Harness settings resolved from the `global` configuration group.
//!
//! Recognised keys:
//!
//! - `screenshotStorePath`: screenshot root. Blank or missing means
//!   `<cwd>/target/screenshots_store`; a value mentioning `user.dir` means the
//!   working directory itself.
//! - `reportStorePath`: report root, defaulting to `<cwd>/target/reports`.
//! - `reportCategory`: sub-directory for report files.
//! - `reportFormat`: `json` or `junit`.
//! - `viewport`: `maximized` or `<width>x<height>`.

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::ConfigStore;
use crate::error::ConfigError;
use crate::reporting::ReportFormat;
use crate::resource::Viewport;

/// Configuration group holding harness settings.
pub const GLOBAL_ALIAS: &str = "global";

const USER_DIR_PLACEHOLDER: &str = "user.dir";
const DEFAULT_REPORT_CATEGORY: &str = "AutomationReports";

/// Paths and options consumed by [`UnitLifecycle`](crate::UnitLifecycle).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessSettings {
    /// Root under which screenshot directories are created.
    pub screenshot_root: Utf8PathBuf,
    /// Root under which report categories are created.
    pub report_root: Utf8PathBuf,
    /// Report sub-directory below `report_root`.
    pub report_category: String,
    /// Output format of the report file.
    pub report_format: ReportFormat,
    /// Window sizing applied when resources are constructed.
    pub viewport: Viewport,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        let cwd = working_directory();
        Self {
            screenshot_root: default_screenshot_root(&cwd),
            report_root: cwd.join("target").join("reports"),
            report_category: DEFAULT_REPORT_CATEGORY.to_owned(),
            report_format: ReportFormat::default(),
            viewport: Viewport::default(),
        }
    }
}

impl HarnessSettings {
    /// Resolve settings from the `global` group of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAlias`] when the store has no `global`
    /// group and [`ConfigError::Malformed`] for unparsable values.
    ///
    /// # Examples
    ///
    /// ```
    /// use unitscope::config::MemoryConfigStore;
    /// use unitscope::resource::Viewport;
    /// use unitscope::settings::HarnessSettings;
    ///
    /// let store = MemoryConfigStore::new()
    ///     .with("global", "screenshotStorePath", "/tmp/shots")
    ///     .with("global", "viewport", "1024x768");
    /// let settings = HarnessSettings::from_store(&store).unwrap();
    /// assert_eq!(settings.screenshot_root, "/tmp/shots");
    /// assert_eq!(settings.viewport, Viewport::Fixed { width: 1024, height: 768 });
    /// ```
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        let cwd = working_directory();
        let defaults = Self::default();
        let screenshot_root = resolve_screenshot_root(
            store.get(GLOBAL_ALIAS, "screenshotStorePath")?.as_deref(),
            &cwd,
        );
        let report_root = store
            .get(GLOBAL_ALIAS, "reportStorePath")?
            .filter(|value| !value.trim().is_empty())
            .map_or(defaults.report_root, Utf8PathBuf::from);
        let report_category = store
            .get(GLOBAL_ALIAS, "reportCategory")?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.report_category);
        let report_format = match store.get(GLOBAL_ALIAS, "reportFormat")? {
            Some(value) => value.parse()?,
            None => defaults.report_format,
        };
        let viewport = match store.get(GLOBAL_ALIAS, "viewport")? {
            Some(value) => value.parse()?,
            None => defaults.viewport,
        };
        Ok(Self {
            screenshot_root,
            report_root,
            report_category,
            report_format,
            viewport,
        })
    }

    /// Replace the screenshot root.
    #[must_use]
    pub fn with_screenshot_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.screenshot_root = root.into();
        self
    }

    /// Replace the report root.
    #[must_use]
    pub fn with_report_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.report_root = root.into();
        self
    }

    /// Replace the report format.
    #[must_use]
    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    /// Replace the viewport.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

fn working_directory() -> Utf8PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

fn default_screenshot_root(cwd: &Utf8Path) -> Utf8PathBuf {
    cwd.join("target").join("screenshots_store")
}

fn resolve_screenshot_root(configured: Option<&str>, cwd: &Utf8Path) -> Utf8PathBuf {
    match configured.map(str::trim) {
        None | Some("") => default_screenshot_root(cwd),
        Some(value) if value.to_lowercase().contains(USER_DIR_PLACEHOLDER) => cwd.to_owned(),
        Some(value) => Utf8PathBuf::from(value),
    }
}
