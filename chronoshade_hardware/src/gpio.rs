use crate::error::{HwError, Result};
use crate::{Relay, RelayPins};
use chronoshade_traits::{BoxError, Direction, LevelActuator, MomentaryActuator, Pulse};
use rppal::gpio::{Gpio, OutputPin};

/// Relay set wired to Raspberry Pi GPIO pins (active high).
pub struct GpioRelay {
    open: OutputPin,
    close: OutputPin,
    stop: Option<OutputPin>,
}

impl GpioRelay {
    pub fn new(pins: RelayPins) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let output = |pin: u8| -> Result<OutputPin> {
            gpio.get(pin)
                .map(|p| p.into_output_low())
                .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))
        };
        let relay = Self {
            open: output(pins.open)?,
            close: output(pins.close)?,
            stop: pins.stop.map(output).transpose()?,
        };
        tracing::info!(open = pins.open, close = pins.close, stop = ?pins.stop, "gpio relay ready");
        Ok(relay)
    }

    fn release_all(&mut self) {
        self.open.set_low();
        self.close.set_low();
        if let Some(stop) = self.stop.as_mut() {
            stop.set_low();
        }
    }

    /// Energize `relay` alone. Fails without touching any pin when the stop
    /// relay is asked for but not wired.
    fn select(&mut self, relay: Relay) -> Result<()> {
        if relay == Relay::Stop && self.stop.is_none() {
            return Err(HwError::Gpio("no stop relay wired".into()));
        }
        self.release_all();
        match relay {
            Relay::Open => self.open.set_high(),
            Relay::Close => self.close.set_high(),
            Relay::Stop => {
                if let Some(stop) = self.stop.as_mut() {
                    stop.set_high();
                }
            }
        }
        tracing::debug!(relay = relay.as_str(), "gpio relay energized");
        Ok(())
    }
}

impl LevelActuator for GpioRelay {
    fn start(&mut self, direction: Direction) -> std::result::Result<(), BoxError> {
        self.select(Relay::for_direction(direction))?;
        Ok(())
    }

    fn stop(&mut self) -> std::result::Result<(), BoxError> {
        self.release_all();
        Ok(())
    }
}

impl MomentaryActuator for GpioRelay {
    fn trigger(&mut self, pulse: Pulse) -> std::result::Result<(), BoxError> {
        self.select(Relay::for_pulse(pulse))?;
        Ok(())
    }

    fn release(&mut self) -> std::result::Result<(), BoxError> {
        self.release_all();
        Ok(())
    }
}

impl Drop for GpioRelay {
    fn drop(&mut self) {
        self.release_all();
    }
}
