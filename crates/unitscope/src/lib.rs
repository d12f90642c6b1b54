//! Per-worker resource lifecycle and step reporting for parallel test runs.
//!
//! A test runner with several worker threads calls
//! [`UnitLifecycle::on_unit_start`] before each unit of work and
//! [`UnitLifecycle::on_unit_end`] after it. In between, step code logs through
//! the [`LoggingPipeline`], which attaches a screenshot when one can be taken,
//! writes the entry into the process-wide report and collects `fail` statuses
//! as soft assertions that the end-hook raises together.
//!
//! Worker-exclusive state lives in [`WorkerMap`]s keyed by [`WorkerId`]; the
//! report sink is the only state shared between workers.
//!
//! ```
//! use std::sync::Arc;
//! use unitscope::UnitLifecycle;
//! use unitscope::reporting::ReportSink;
//! use unitscope::test_support::{FakeResourceFactory, MemoryReportWriter, TestUnit};
//! use unitscope::worker::WorkerId;
//!
//! let writer = MemoryReportWriter::new();
//! let sink_writer = writer.clone();
//! let hooks = UnitLifecycle::builder(FakeResourceFactory::new())
//!     .sink_factory(move || Ok(ReportSink::new(sink_writer.clone())))
//!     .build();
//! let worker = WorkerId::new(1);
//! let unit = Arc::new(TestUnit::new("checkout"));
//!
//! hooks.on_unit_start_as(worker, unit.clone()).unwrap();
//! hooks.pipeline().log_text_as(worker, "pass", "step1");
//! hooks.pipeline().log_text_as(worker, "fail", "step2");
//! let error = hooks.on_unit_end_as(worker, unit.as_ref()).unwrap_err();
//! assert!(error.to_string().contains("step2"));
//! ```

pub mod assertions;
pub mod capture;
mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
mod panic;
pub mod pipeline;
pub mod reporting;
pub mod resource;
pub mod settings;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod worker;

pub use assertions::AssertionAggregator;
pub use error::{AggregatedAssertionError, LifecycleError};
pub use lifecycle::{UnitDescriptor, UnitLifecycle, UnitLifecycleBuilder};
pub use panic::panic_message;
pub use pipeline::LoggingPipeline;
pub use reporting::{ReportSinkCell, UnitOutcome};
pub use resource::{ResourceFactory, ResourceHandle, ResourceRegistry, Viewport};
pub use settings::HarnessSettings;
pub use status::StatusValue;
pub use worker::{WorkerId, WorkerMap};
