//! Timestamps embedded in artifact and report file names.

use chrono::{DateTime, Local};

/// `day_month_year_hour_minute_second`, e.g. `07_Mar_2025_14_05_09`.
const FILE_STAMP_FORMAT: &str = "%d_%b_%Y_%H_%M_%S";

pub(crate) fn file_stamp(at: DateTime<Local>) -> String {
    at.format(FILE_STAMP_FORMAT).to_string()
}

pub(crate) fn file_stamp_now() -> String {
    file_stamp(Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamps_are_filesystem_safe() {
        let Some(at) = Local.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).single() else {
            panic!("unambiguous local time expected");
        };
        assert_eq!(file_stamp(at), "07_Mar_2025_14_05_09");
    }
}
