//! JSON writer for unit records.
//!
//! Status labels are lowercase so downstream tools can rely on consistent
//! casing. Entries without a screenshot omit the `artifact` field.

use std::io::Write;

use serde::Serialize;

use super::{LogEntry, UnitRecord};
use crate::status::StatusValue;

#[derive(Serialize)]
struct JsonReport<'a> {
    units: Vec<JsonUnit<'a>>,
}

#[derive(Serialize)]
struct JsonUnit<'a> {
    name: &'a str,
    status: &'static str,
    entries: Vec<JsonEntry<'a>>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    status: StatusValue,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<&'a str>,
}

impl<'a> From<&'a [UnitRecord]> for JsonReport<'a> {
    fn from(records: &'a [UnitRecord]) -> Self {
        Self {
            units: records.iter().map(JsonUnit::from).collect(),
        }
    }
}

impl<'a> From<&'a UnitRecord> for JsonUnit<'a> {
    fn from(record: &'a UnitRecord) -> Self {
        Self {
            name: record.name(),
            status: record.outcome().label(),
            entries: record.entries().iter().map(JsonEntry::from).collect(),
        }
    }
}

impl<'a> From<&'a LogEntry> for JsonEntry<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        Self {
            status: entry.status(),
            description: entry.description(),
            artifact: entry.artifact().map(camino::Utf8Path::as_str),
        }
    }
}

/// Serialize the provided unit records into the supplied writer.
///
/// # Examples
/// ```rust
/// use unitscope::reporting::{json, UnitOutcome, UnitRecord};
///
/// let records = vec![UnitRecord::new("login", UnitOutcome::Passed, Vec::new())];
/// let mut buffer = Vec::new();
/// json::write(&mut buffer, &records).unwrap();
/// let output = String::from_utf8(buffer).unwrap();
/// assert!(output.contains("\"status\":\"passed\""));
/// ```
///
/// # Errors
/// Returns an error when serialization of the provided records fails.
pub fn write<W: Write>(writer: &mut W, records: &[UnitRecord]) -> serde_json::Result<()> {
    serde_json::to_writer(writer, &JsonReport::from(records))
}

/// Produce a JSON string representation of the provided unit records.
///
/// # Errors
/// Returns an error when serializing the provided records fails.
pub fn to_string(records: &[UnitRecord]) -> serde_json::Result<String> {
    serde_json::to_string(&JsonReport::from(records))
}
