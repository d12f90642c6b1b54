//! Unit tests for the resource registry.

use super::*;
use crate::test_support::{Behaviour, FakeResourceFactory};
use rstest::{fixture, rstest};

#[fixture]
fn worker() -> WorkerId {
    WorkerId::new(11)
}

#[rstest]
fn init_twice_constructs_one_handle(worker: WorkerId) {
    let factory = FakeResourceFactory::new();
    let state = factory.state();
    let registry = ResourceRegistry::new(factory, Viewport::Maximised);

    assert!(registry.init(worker).is_ok());
    assert!(registry.init(worker).is_ok());

    assert_eq!(state.created(), 1);
    assert!(registry.is_initialized(worker));
    assert_eq!(registry.live_count(), 1);
}

#[rstest]
fn handles_are_per_worker(worker: WorkerId) {
    let factory = FakeResourceFactory::new();
    let state = factory.state();
    let registry = ResourceRegistry::new(factory, Viewport::Maximised);
    let other = WorkerId::new(12);

    assert!(registry.init(worker).is_ok());
    assert!(registry.init(other).is_ok());
    assert_eq!(state.created(), 2);

    registry.teardown(worker);
    assert!(registry.get(worker).is_none());
    assert!(registry.get(other).is_some());
}

#[rstest]
fn get_never_constructs(worker: WorkerId) {
    let factory = FakeResourceFactory::new();
    let state = factory.state();
    let registry = ResourceRegistry::new(factory, Viewport::Maximised);

    assert!(registry.get(worker).is_none());
    assert_eq!(state.created(), 0);
}

#[rstest]
fn factory_receives_configured_viewport(worker: WorkerId) {
    let factory = FakeResourceFactory::new();
    let state = factory.state();
    let viewport = Viewport::Fixed {
        width: 1366,
        height: 768,
    };
    let registry = ResourceRegistry::new(factory, viewport);

    assert!(registry.init(worker).is_ok());
    assert_eq!(state.last_viewport(), Some(viewport));
}

#[rstest]
#[case(Behaviour::Succeed)]
#[case(Behaviour::Fail)]
#[case(Behaviour::Panic)]
fn teardown_always_clears_the_slot(worker: WorkerId, #[case] release: Behaviour) {
    let factory = FakeResourceFactory::new().releasing(release);
    let state = factory.state();
    let registry = ResourceRegistry::new(factory, Viewport::Maximised);

    assert!(registry.init(worker).is_ok());
    registry.teardown(worker);

    assert!(registry.get(worker).is_none());
    assert_eq!(state.release_attempts(), 1);
    assert_eq!(registry.live_count(), 0);
}

#[rstest]
fn teardown_without_handle_is_silent(worker: WorkerId) {
    let factory = FakeResourceFactory::new();
    let state = factory.state();
    let registry = ResourceRegistry::new(factory, Viewport::Maximised);

    registry.teardown(worker);
    assert_eq!(state.release_attempts(), 0);
}

#[rstest]
fn teardown_allows_a_fresh_handle(worker: WorkerId) {
    let factory = FakeResourceFactory::new();
    let state = factory.state();
    let registry = ResourceRegistry::new(factory, Viewport::Maximised);

    assert!(registry.init(worker).is_ok());
    registry.teardown(worker);
    assert!(registry.init(worker).is_ok());
    assert_eq!(state.created(), 2);
}

#[rstest]
#[case(Behaviour::Fail)]
#[case(Behaviour::Panic)]
fn failed_construction_leaves_slot_empty(worker: WorkerId, #[case] create: Behaviour) {
    let registry = ResourceRegistry::new(
        FakeResourceFactory::new().creating(create),
        Viewport::Maximised,
    );

    let Err(error) = registry.init(worker) else {
        panic!("construction should fail");
    };
    match create {
        Behaviour::Fail => assert!(matches!(error, ResourceInitError::Construction(_))),
        _ => assert!(matches!(error, ResourceInitError::Panicked(_))),
    }
    assert!(!registry.is_initialized(worker));
}

#[rstest]
#[case("maximized", Viewport::Maximised)]
#[case("Maximise", Viewport::Maximised)]
#[case("1920x1080", Viewport::Fixed { width: 1920, height: 1080 })]
#[case(" 800 X 600 ", Viewport::Fixed { width: 800, height: 600 })]
fn viewport_parses(#[case] text: &str, #[case] expected: Viewport) {
    assert!(matches!(text.parse::<Viewport>(), Ok(parsed) if parsed == expected));
}

#[rstest]
#[case("fullscreen")]
#[case("0x600")]
#[case("800x")]
#[case("wide x tall")]
fn viewport_rejects_garbage(#[case] text: &str) {
    assert!(matches!(
        text.parse::<Viewport>(),
        Err(ConfigError::Malformed { key, .. }) if key == "viewport"
    ));
}
