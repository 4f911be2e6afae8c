//! Adapters from the two actuator capabilities to `DirectionalActuator`.

use chronoshade_traits::{
    BoxError, Direction, DirectionalActuator, LevelActuator, MomentaryActuator, Pulse,
};

/// Level-triggered backend: start holds a direction, stop drops it.
#[derive(Debug)]
pub struct Level<A>(pub A);

impl<A: LevelActuator> DirectionalActuator for Level<A> {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.0.start(direction)
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        self.0.stop()
    }
}

/// Momentary backend: each command is a pulse that must be released.
#[derive(Debug)]
pub struct Momentary<A>(pub A);

impl<A: MomentaryActuator> DirectionalActuator for Momentary<A> {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.0.trigger(match direction {
            Direction::Opening => Pulse::Open,
            Direction::Closing => Pulse::Close,
        })
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        self.0.trigger(Pulse::Stop)
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.0.release()
    }

    fn needs_release(&self) -> bool {
        true
    }
}
