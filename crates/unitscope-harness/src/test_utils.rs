//! Shared test helpers for `unitscope-harness`.

use std::any::Any;

use unitscope::panic_message;

/// Returns true when a panic payload matches the expected message.
pub(crate) fn panic_payload_matches(payload: &(dyn Any + Send), expected: &str) -> bool {
    panic_message(payload) == expected
}

/// Returns true when a panic payload mentions `fragment`.
pub(crate) fn panic_payload_contains(payload: &(dyn Any + Send), fragment: &str) -> bool {
    panic_message(payload).contains(fragment)
}
