//! `JUnit` XML writer for unit records.
//!
//! The writer produces a single `<testsuite>` document. Failed units carry a
//! `<failure>` child listing their failing entries; units that never reached
//! their end-hook are reported as `<skipped>`. Every entry is echoed into
//! `<system-out>` so screenshots stay discoverable from CI.

use std::fmt::{self, Write};

use super::{UnitOutcome, UnitRecord};

const PENDING_MESSAGE: &str = "unit did not reach its end-hook";
const UNREPORTED_FAILURE_MESSAGE: &str = "unit failed outside its logged steps";

/// Render the supplied unit records as a `JUnit` XML document.
///
/// # Examples
/// ```
/// use unitscope::reporting::{junit, UnitOutcome, UnitRecord};
///
/// let records = vec![UnitRecord::new("login", UnitOutcome::Passed, Vec::new())];
/// let mut output = String::new();
/// junit::write(&mut output, &records).unwrap();
/// assert!(output.contains("<testsuite"));
/// ```
///
/// # Errors
/// Returns an error if writing to the provided formatter fails.
pub fn write<W: Write>(writer: &mut W, records: &[UnitRecord]) -> fmt::Result {
    let tests = records.len();
    let failures = count(records, UnitOutcome::Failed);
    let skipped = count(records, UnitOutcome::Pending);
    writer.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
    writeln!(
        writer,
        "<testsuite name=\"unitscope\" tests=\"{tests}\" failures=\"{failures}\" skipped=\"{skipped}\">",
    )?;
    for record in records {
        write_testcase(writer, record)?;
    }
    writer.write_str("</testsuite>\n")
}

fn count(records: &[UnitRecord], outcome: UnitOutcome) -> usize {
    records
        .iter()
        .filter(|record| record.outcome() == outcome)
        .count()
}

fn write_testcase<W: Write>(writer: &mut W, record: &UnitRecord) -> fmt::Result {
    writer.write_str("  <testcase name=\"")?;
    write_escaped(writer, record.name())?;
    writer.write_str("\" classname=\"unitscope\"")?;
    if record.outcome() == UnitOutcome::Passed && record.entries().is_empty() {
        return writer.write_str(" />\n");
    }
    writer.write_str(">\n")?;
    match record.outcome() {
        UnitOutcome::Passed => {}
        UnitOutcome::Failed => {
            let failing = record.failures().count();
            if failing == 0 {
                writeln!(writer, "    <failure message=\"{UNREPORTED_FAILURE_MESSAGE}\" />")?;
            } else {
                writeln!(writer, "    <failure message=\"{failing} failing step(s)\">")?;
                for entry in record.failures() {
                    write_escaped(writer, entry.description())?;
                    writer.write_char('\n')?;
                }
                writer.write_str("    </failure>\n")?;
            }
        }
        UnitOutcome::Pending => {
            writeln!(writer, "    <skipped message=\"{PENDING_MESSAGE}\" />")?;
        }
    }
    if !record.entries().is_empty() {
        writer.write_str("    <system-out>")?;
        for entry in record.entries() {
            write!(writer, "[{}] ", entry.status())?;
            write_escaped(writer, entry.description())?;
            if let Some(artifact) = entry.artifact() {
                writer.write_str(" (")?;
                write_escaped(writer, artifact.as_str())?;
                writer.write_char(')')?;
            }
            writer.write_char('\n')?;
        }
        writer.write_str("</system-out>\n")?;
    }
    writer.write_str("  </testcase>\n")
}

fn write_escaped<W: Write>(writer: &mut W, value: &str) -> fmt::Result {
    const INVALID_REPLACEMENT: &str = "&#xFFFD;";
    for character in value.chars() {
        if !is_valid_xml_character(character) {
            writer.write_str(INVALID_REPLACEMENT)?;
            continue;
        }
        match character {
            '&' => writer.write_str("&amp;")?,
            '<' => writer.write_str("&lt;")?,
            '>' => writer.write_str("&gt;")?,
            '"' => writer.write_str("&quot;")?,
            '\'' => writer.write_str("&apos;")?,
            other => writer.write_char(other)?,
        }
    }
    Ok(())
}

fn is_valid_xml_character(character: char) -> bool {
    matches!(
        u32::from(character),
        0x09 | 0x0A | 0x0D
            | 0x20..=0xD7FF
            | 0xE000..=0xFFFD
            | 0x1_0000..=0x10_FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::LogEntry;
    use crate::status::StatusValue;
    use camino::Utf8PathBuf;

    fn render(records: &[UnitRecord]) -> String {
        let mut output = String::new();
        let Ok(()) = write(&mut output, records) else {
            panic!("writing into a String cannot fail");
        };
        output
    }

    #[test]
    fn counts_failures_and_pending_units() {
        let output = render(&[
            UnitRecord::new("a", UnitOutcome::Passed, Vec::new()),
            UnitRecord::new("b", UnitOutcome::Failed, Vec::new()),
            UnitRecord::new("c", UnitOutcome::Pending, Vec::new()),
        ]);
        assert!(output.contains("tests=\"3\" failures=\"1\" skipped=\"1\""));
        assert!(output.contains("<testcase name=\"a\" classname=\"unitscope\" />"));
        assert!(output.contains(PENDING_MESSAGE));
    }

    #[test]
    fn failure_without_failing_steps_uses_generic_message() {
        let output = render(&[UnitRecord::new(
            "checkout",
            UnitOutcome::Failed,
            vec![LogEntry::new(StatusValue::Pass, "cart opened", None)],
        )]);
        assert!(output.contains(&format!("<failure message=\"{UNREPORTED_FAILURE_MESSAGE}\" />")));
        assert!(!output.contains("0 failing step(s)"));
        assert!(output.contains("[pass] cart opened"));
    }

    #[test]
    fn failure_lists_failing_entries_only() {
        let output = render(&[UnitRecord::new(
            "checkout",
            UnitOutcome::Failed,
            vec![
                LogEntry::new(StatusValue::Pass, "cart opened", None),
                LogEntry::new(
                    StatusValue::Fail,
                    "fail - total <wrong>",
                    Some(Utf8PathBuf::from("/shots/t.png")),
                ),
            ],
        )]);
        assert!(output.contains("<failure message=\"1 failing step(s)\">\nfail - total &lt;wrong&gt;\n"));
        assert!(output.contains("[pass] cart opened\n"));
        assert!(output.contains("[fail] fail - total &lt;wrong&gt; (/shots/t.png)\n"));
    }

    #[test]
    fn invalid_xml_characters_are_replaced() {
        let output = render(&[UnitRecord::new(
            "bell\u{7}",
            UnitOutcome::Passed,
            Vec::new(),
        )]);
        assert!(output.contains("name=\"bell&#xFFFD;\""));
    }
}
