//! Panic containment for collaborator calls.
//!
//! Resource factories, capture backends and report writers are supplied by
//! the embedding harness. A panic inside one of them must not take the unit
//! under test down with it, so every such call goes through [`contain`],
//! which turns the panic payload into text.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Formats a panic payload into a readable message.
///
/// String payloads are extracted directly; anything else is rendered with
/// its `Debug` implementation.
///
/// # Examples
///
/// ```
/// use unitscope::panic_message;
/// use std::any::Any;
///
/// let payload: Box<dyn Any + Send> = Box::new("boom");
/// assert_eq!(panic_message(payload.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| format!("{payload:?}"))
}

/// Run `call`, converting a panic into `Err(message)`.
///
/// The closure is asserted unwind-safe: callers only hand in closures whose
/// captured state is discarded or re-validated when a panic occurs.
pub(crate) fn contain<T>(call: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| panic_message(payload.as_ref()))
}
