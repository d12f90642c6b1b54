//! Harness that wraps each unit body in the lifecycle hooks.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use unitscope::{UnitDescriptor, UnitLifecycle, panic_message};

use crate::adapter::HarnessAdapter;
use crate::runner::{RunningUnit, UnitRunRequest};

/// Runs units between [`UnitLifecycle::on_unit_start`] and
/// [`UnitLifecycle::on_unit_end`] on the calling thread.
///
/// A failing begin-hook skips the body. The end-hook always runs. The first
/// failure (begin-hook, body panic, end-hook) is then raised as a panic so
/// the surrounding test runner reports the unit as failed.
#[derive(Debug, Clone)]
pub struct LifecycleHarness {
    lifecycle: Arc<UnitLifecycle>,
}

impl LifecycleHarness {
    /// Harness driving `lifecycle`.
    #[must_use]
    pub fn new(lifecycle: Arc<UnitLifecycle>) -> Self {
        Self { lifecycle }
    }

    /// The hooks this harness drives, e.g. for step logging.
    #[must_use]
    pub fn lifecycle(&self) -> &UnitLifecycle {
        &self.lifecycle
    }
}

impl HarnessAdapter for LifecycleHarness {
    fn run<T>(&self, request: UnitRunRequest<'_, T>) -> T {
        let (metadata, runner) = request.into_parts();
        let unit = Arc::new(RunningUnit::new(metadata));
        let name = unit.name().to_owned();

        let descriptor: Arc<dyn UnitDescriptor> = unit.clone();
        let body = self
            .lifecycle
            .on_unit_start(descriptor)
            .map(|()| panic::catch_unwind(AssertUnwindSafe(|| runner.run())));
        match &body {
            Ok(Ok(_)) => {}
            Ok(Err(payload)) => {
                unit.mark_failed();
                unit.attach_log(&format!("panicked: {}", panic_message(payload.as_ref())));
            }
            Err(_) => unit.mark_failed(),
        }
        let ended = self.lifecycle.on_unit_end(unit.as_ref());

        match body {
            Err(error) => {
                if let Err(end_error) = ended {
                    log::warn!("end-hook for unit '{name}' failed after an aborted start: {end_error}");
                }
                panic!("unit '{name}' failed: {error}")
            }
            Ok(Err(payload)) => {
                if let Err(error) = ended {
                    log::warn!("end-hook for unit '{name}' failed after a panic: {error}");
                }
                panic::resume_unwind(payload)
            }
            Ok(Ok(value)) => match ended {
                Ok(()) => value,
                Err(error) => panic!("unit '{name}' failed: {error}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleHarness;
    use crate::test_utils::{panic_payload_contains, panic_payload_matches};
    use crate::{HarnessAdapter, UnitMetadata, UnitRunRequest, UnitRunner};
    use rstest::{fixture, rstest};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use unitscope::UnitLifecycle;
    use unitscope::UnitOutcome;
    use unitscope::reporting::ReportSink;
    use unitscope::test_support::{Behaviour, FakeResourceFactory, MemoryReportWriter};

    struct Rig {
        harness: LifecycleHarness,
        writer: MemoryReportWriter,
    }

    fn rig(factory: FakeResourceFactory) -> Rig {
        let writer = MemoryReportWriter::new();
        let sink_writer = writer.clone();
        let lifecycle = UnitLifecycle::builder(factory)
            .sink_factory(move || Ok(ReportSink::new(sink_writer.clone())))
            .build();
        Rig {
            harness: LifecycleHarness::new(Arc::new(lifecycle)),
            writer,
        }
    }

    #[fixture]
    fn healthy() -> Rig {
        rig(FakeResourceFactory::new())
    }

    fn request<'a, T>(runner: UnitRunner<'a, T>) -> UnitRunRequest<'a, T> {
        UnitRunRequest::new(
            UnitMetadata::new("tests/features/cart.feature", "Cart", 5, vec![]),
            runner,
        )
    }

    fn last_outcome(writer: &MemoryReportWriter) -> Option<UnitOutcome> {
        writer
            .last()
            .and_then(|records| records.last().map(unitscope::reporting::UnitRecord::outcome))
    }

    #[rstest]
    fn passing_body_returns_its_value(healthy: Rig) {
        let value = healthy.harness.run(request(UnitRunner::new(|| 9)));

        assert_eq!(value, 9);
        assert_eq!(last_outcome(&healthy.writer), Some(UnitOutcome::Passed));
    }

    #[rstest]
    fn body_panic_fails_the_unit_and_is_reraised(healthy: Rig) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            healthy
                .harness
                .run(request(UnitRunner::new(|| -> u8 { panic!("boom") })));
        }));

        let Err(payload) = result else {
            panic!("body panic should propagate");
        };
        assert!(panic_payload_matches(payload.as_ref(), "boom"));
        assert_eq!(last_outcome(&healthy.writer), Some(UnitOutcome::Failed));
        assert_eq!(healthy.harness.lifecycle().registry().live_count(), 0);
    }

    #[test]
    fn start_failure_skips_the_body() {
        let rig = rig(FakeResourceFactory::new().creating(Behaviour::Fail));
        let mut ran = false;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            rig.harness.run(request(UnitRunner::new(|| ran = true)));
        }));

        let Err(payload) = result else {
            panic!("start failure should propagate");
        };
        assert!(panic_payload_contains(payload.as_ref(), "unit aborted before start"));
        assert!(!ran);
        assert_eq!(last_outcome(&rig.writer), Some(UnitOutcome::Failed));
    }

    #[test]
    fn start_failure_outranks_a_failing_report_flush() {
        let rig = rig(FakeResourceFactory::new().creating(Behaviour::Fail));
        rig.writer.set_failing(true);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            rig.harness.run(request(UnitRunner::new(|| ())));
        }));

        let Err(payload) = result else {
            panic!("start failure should propagate");
        };
        assert!(panic_payload_contains(payload.as_ref(), "unit aborted before start"));
        assert!(rig.writer.last().is_none());
        assert_eq!(rig.harness.lifecycle().registry().live_count(), 0);
    }

    #[rstest]
    fn soft_failures_fail_the_run(healthy: Rig) {
        let pipeline = healthy.harness.lifecycle().pipeline();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            healthy.harness.run(request(UnitRunner::new(|| {
                pipeline.log_text("pass", "step1");
                pipeline.log_text("fail", "step2");
            })))
        }));

        let Err(payload) = result else {
            panic!("soft failure should propagate");
        };
        assert!(panic_payload_contains(payload.as_ref(), "step2"));
        assert_eq!(last_outcome(&healthy.writer), Some(UnitOutcome::Failed));
    }
}
