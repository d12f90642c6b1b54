//! Status vocabulary for log entries.
//!
//! Callers describe outcomes with free text ("pass", "Failed", "warn", ...).
//! [`StatusValue`] folds that text onto a small closed set. The mapping is
//! total: anything unrecognised becomes [`StatusValue::Info`].

use std::fmt;

use serde::Serialize;

/// Closed set of statuses recorded against a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusValue {
    /// The step behaved as expected.
    Pass,
    /// The step failed; recorded as a soft failure for the unit.
    Fail,
    /// Something looked wrong but the unit can continue.
    Warning,
    /// The step was skipped.
    Skip,
    /// Informational entry.
    Info,
}

impl StatusValue {
    /// Map free-form status text onto a status.
    ///
    /// Text is trimmed and compared case-insensitively. `"fatal"` has no
    /// severity of its own and maps to [`StatusValue::Fail`].
    ///
    /// # Examples
    ///
    /// ```
    /// use unitscope::StatusValue;
    ///
    /// assert_eq!(StatusValue::from_text(" PASS "), StatusValue::Pass);
    /// assert_eq!(StatusValue::from_text("fatal"), StatusValue::Fail);
    /// assert_eq!(StatusValue::from_text("anything else"), StatusValue::Info);
    /// ```
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "pass" => Self::Pass,
            "fail" | "failed" | "fatal" => Self::Fail,
            "warn" | "warning" => Self::Warning,
            "skip" => Self::Skip,
            _ => Self::Info,
        }
    }

    /// Whether this status counts as a soft failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Fail)
    }

    /// Lowercase label used in rendered reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warning => "warning",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }
}

impl From<&str> for StatusValue {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
