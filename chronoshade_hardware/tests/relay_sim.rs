use chronoshade_hardware::error::HwError;
use chronoshade_hardware::{Relay, RelayEvent, SimulatedRelay};
use chronoshade_traits::{Direction, LevelActuator, MomentaryActuator, Pulse};
use rstest::rstest;

#[rstest]
#[case(Pulse::Open, Relay::Open)]
#[case(Pulse::Close, Relay::Close)]
#[case(Pulse::Stop, Relay::Stop)]
fn momentary_pulse_energizes_one_relay_until_release(#[case] pulse: Pulse, #[case] relay: Relay) {
    let mut r = SimulatedRelay::new("bedroom");
    r.trigger(pulse).unwrap();
    assert_eq!(r.energized(), vec![relay]);
    r.release().unwrap();
    assert!(r.energized().is_empty());
    assert_eq!(r.events(), vec![RelayEvent::On(relay), RelayEvent::Off(relay)]);
}

#[test]
fn level_stop_releases_held_relay() {
    let mut r = SimulatedRelay::new("bedroom");
    LevelActuator::start(&mut r, Direction::Closing).unwrap();
    LevelActuator::stop(&mut r).unwrap();
    assert!(r.energized().is_empty());
    // stopping an idle relay set is harmless
    LevelActuator::stop(&mut r).unwrap();
    assert_eq!(r.events().len(), 2);
}

#[test]
fn injected_fault_surfaces_as_hw_error() {
    let mut r = SimulatedRelay::new("garage");
    let handle = r.clone();
    handle.set_failing(true);
    let err = LevelActuator::start(&mut r, Direction::Opening).unwrap_err();
    let hw = err.downcast_ref::<HwError>().expect("typed hardware error");
    assert!(matches!(hw, HwError::Injected(name) if name == "garage"));
    assert!(handle.events().is_empty());

    handle.set_failing(false);
    LevelActuator::start(&mut r, Direction::Opening).unwrap();
    assert_eq!(handle.energized(), vec![Relay::Open]);
}
