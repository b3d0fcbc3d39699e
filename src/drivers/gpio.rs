//! Digital line seams over `embedded-hal`.
//!
//! Drivers in this crate talk to [`OutputLine`] / [`InputLine`] rather than
//! to `embedded_hal::digital` directly, so they can be stored behind
//! `Box<dyn ...>` regardless of the HAL's per-pin error type. Every
//! `OutputPin` / `InputPin` gets the seam for free through the blanket impls.

use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use log::warn;

use crate::error::{ActuatorError, SensorError};

/// A push-pull output the firmware drives high or low.
pub trait OutputLine: Send {
    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError>;
}

/// A digital input the firmware samples.
pub trait InputLine: Send {
    fn read_level(&mut self) -> Result<bool, SensorError>;
}

impl<P> OutputLine for P
where
    P: OutputPin + Send,
{
    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError> {
        let result = if high { self.set_high() } else { self.set_low() };
        result.map_err(|e| {
            warn!("gpio: write {} failed ({:?})", if high { "high" } else { "low" }, e.kind());
            ActuatorError::GpioWriteFailed
        })
    }
}

impl<P> InputLine for P
where
    P: InputPin + Send,
{
    fn read_level(&mut self) -> Result<bool, SensorError> {
        self.is_high().map_err(|e| {
            warn!("gpio: read failed ({:?})", e.kind());
            SensorError::GpioReadFailed
        })
    }
}
