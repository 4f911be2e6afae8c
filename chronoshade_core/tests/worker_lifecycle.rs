//! Cover worker thread lifecycle and command serialization.
//!
//! Verifies that:
//! - The worker thread is joined when its handle is dropped
//! - A cover still moving at shutdown is stopped and its estimate persisted
//! - Commands, errors and snapshots cross the thread boundary intact

use chronoshade_core::mocks::{ActuatorCall, RecordingActuator};
use chronoshade_core::{
    CoverError, CoverHandle, CoverSetup, MemoryStore, Motion, MovementController, PositionProfile,
    Timing,
};
use chronoshade_traits::Direction;
use chronoshade_traits::clock::test_clock::TestClock;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn setup(travel: Duration) -> CoverSetup {
    CoverSetup::new("porch", PositionProfile::linear(travel).unwrap()).with_timing(Timing {
        tick: Duration::from_millis(10),
        release_delay: Duration::from_millis(30),
    })
}

fn spawn(
    travel: Duration,
    act: &RecordingActuator,
    store: &MemoryStore,
) -> CoverHandle {
    let controller = MovementController::new(setup(travel), act.clone(), store.clone());
    CoverHandle::spawn(controller).expect("spawn worker")
}

#[test]
fn moving_cover_is_stopped_when_handle_drops() {
    let act = RecordingActuator::new();
    let store = MemoryStore::new();
    let handle = spawn(Duration::from_secs(60), &act, &store);
    handle.open().unwrap();
    std::thread::sleep(Duration::from_millis(20));

    drop(handle);

    assert_eq!(
        act.calls(),
        vec![ActuatorCall::Start(Direction::Opening), ActuatorCall::Stop]
    );
    let saved = store.get("porch").expect("estimate persisted on shutdown");
    assert!(saved.position < 5, "barely moved, got {}", saved.position);
}

#[test]
fn idle_cover_shuts_down_without_actuator_calls() {
    let act = RecordingActuator::new();
    let store = MemoryStore::new();
    for _ in 0..10 {
        let handle = spawn(Duration::from_secs(1), &act, &store);
        let _ = handle.snapshot().unwrap();
        drop(handle);
    }
    assert!(act.calls().is_empty());
    assert_eq!(store.save_count(), 0);
}

#[test]
fn set_position_runs_to_completion() {
    let act = RecordingActuator::new();
    let store = MemoryStore::new();
    let handle = spawn(Duration::from_millis(400), &act, &store);

    handle.set_position(50).unwrap();
    let snap = handle.wait_idle(WAIT).unwrap();
    assert_eq!(snap.position, 50);
    assert_eq!(snap.motion, Motion::Idle);
    assert_eq!(
        act.calls(),
        vec![ActuatorCall::Start(Direction::Opening), ActuatorCall::Stop]
    );
    assert_eq!(store.get("porch").map(|s| s.position), Some(50));
}

#[test]
fn subscribers_see_progress_then_rest() {
    let act = RecordingActuator::new();
    let store = MemoryStore::new();
    let handle = spawn(Duration::from_millis(300), &act, &store);
    let updates = handle.subscribe().unwrap();

    handle.open().unwrap();
    let mut seen = Vec::new();
    while let Ok(snap) = updates.recv_timeout(WAIT) {
        let done = !snap.is_moving() && snap.position == 100;
        seen.push(snap.position);
        if done {
            break;
        }
    }
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
}

#[test]
fn typed_errors_cross_the_thread_boundary() {
    let act = RecordingActuator::new();
    let handle = spawn(Duration::from_secs(1), &act, &MemoryStore::new());

    let err = handle.open_tilt().unwrap_err();
    assert_eq!(
        err.downcast_ref::<CoverError>(),
        Some(&CoverError::TiltUnsupported)
    );

    act.set_failing(true);
    // closing from 0 never reaches the actuator
    handle.close().unwrap();
    let err = handle.open().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CoverError>(),
        Some(CoverError::Actuator(_))
    ));
    assert!(!handle.snapshot().unwrap().is_moving());
}

#[test]
fn remotes_report_disconnection_after_shutdown() {
    let handle = spawn(
        Duration::from_secs(1),
        &RecordingActuator::new(),
        &MemoryStore::new(),
    );
    let remote = handle.remote();
    drop(handle);
    let err = remote.stop().unwrap_err();
    assert_eq!(
        err.downcast_ref::<CoverError>(),
        Some(&CoverError::Disconnected)
    );
}

#[test]
fn manual_clock_drives_the_stop_deadline() {
    let act = RecordingActuator::new();
    let store = MemoryStore::new();
    let clock = TestClock::new();
    let controller = MovementController::new(setup(Duration::from_secs(30)), act.clone(), store.clone());
    let handle = CoverHandle::spawn_with_clock(controller, clock.clone()).unwrap();

    handle.set_position(40).unwrap();
    assert!(handle.snapshot().unwrap().is_moving());
    clock.advance(Duration::from_secs(15));

    let snap = handle.wait_idle(WAIT).unwrap();
    assert_eq!(snap.position, 40);
    assert_eq!(store.get("porch").map(|s| s.position), Some(40));
}
