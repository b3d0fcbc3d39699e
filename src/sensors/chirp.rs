//! Chirp-style capacitive soil probe (I2C, default address 0x20).
//!
//! Registers are 16-bit big-endian:
//!
//! | Reg  | Direction | Meaning                                   |
//! |------|-----------|-------------------------------------------|
//! | 0x00 | read      | capacitance (moisture, raw)               |
//! | 0x03 | write     | start a light measurement                 |
//! | 0x04 | read      | light (0 = brightest, 65535 = darkest)    |
//! | 0x05 | read      | temperature, tenths of °C, signed         |
//! | 0x07 | read      | firmware version (any read wakes the MCU) |
//! | 0x08 | write     | sleep                                     |

use embedded_hal::i2c::I2c;
use log::debug;

use crate::app::ports::PlantSensorPort;
use crate::error::SensorError;
use crate::sensors::PlantReading;

pub const DEFAULT_ADDRESS: u8 = 0x20;

const REG_CAPACITANCE: u8 = 0x00;
const REG_MEASURE_LIGHT: u8 = 0x03;
const REG_LIGHT: u8 = 0x04;
const REG_TEMPERATURE: u8 = 0x05;
const REG_VERSION: u8 = 0x07;
const REG_SLEEP: u8 = 0x08;

/// Raw capacitance at both ends of the moisture scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub raw_dry: u16,
    pub raw_wet: u16,
}

impl Calibration {
    /// Linear map onto percent. Readings outside the calibrated span land
    /// outside 0–100 and are left for the sampler to reject.
    pub fn moisture_percent(&self, raw: u16) -> f32 {
        let span = f32::from(self.raw_wet) - f32::from(self.raw_dry);
        if span <= 0.0 {
            return f32::NAN;
        }
        (f32::from(raw) - f32::from(self.raw_dry)) / span * 100.0
    }
}

/// Light register to a 0–100 brightness scale.
pub fn luminosity_percent(raw: u16) -> f32 {
    100.0 - f32::from(raw) / f32::from(u16::MAX) * 100.0
}

pub struct ChirpSensor<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Calibration,
}

impl<I2C: I2c> ChirpSensor<I2C> {
    pub fn new(i2c: I2C, address: u8, calibration: Calibration) -> Self {
        Self {
            i2c,
            address,
            calibration,
        }
    }

    fn read_u16(&mut self, reg: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|_| SensorError::BusFailed)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn command(&mut self, reg: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[reg])
            .map_err(|_| SensorError::BusFailed)
    }
}

impl<I2C> PlantSensorPort for ChirpSensor<I2C>
where
    I2C: I2c + Send,
{
    fn wake(&mut self) -> Result<(), SensorError> {
        let version = self.read_u16(REG_VERSION)?;
        debug!("chirp: awake (fw 0x{version:04x})");
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), SensorError> {
        self.command(REG_MEASURE_LIGHT)
    }

    fn read(&mut self) -> Result<PlantReading, SensorError> {
        let capacitance = self.read_u16(REG_CAPACITANCE)?;
        let temperature = self.read_u16(REG_TEMPERATURE)? as i16;
        let light = self.read_u16(REG_LIGHT)?;
        Ok(PlantReading {
            moisture: self.calibration.moisture_percent(capacitance),
            temperature: f32::from(temperature) / 10.0,
            luminosity: luminosity_percent(light),
        })
    }

    fn sleep(&mut self) -> Result<(), SensorError> {
        self.command(REG_SLEEP)
    }
}
