//! Sensor subsystem: soil probe, level ladder and the [`TelemetrySampler`]
//! that merges them into one report.
//!
//! The sampler never returns a physically impossible reading. A rejected
//! attempt (bus fault, moisture outside 0–100 %, temperature above 100 °C)
//! is logged and the whole wake/measure/read/sleep cycle is repeated after a
//! backoff, for as long as it takes. Each attempt blocks for the probe's
//! settle time, so the sampler is only ever driven from the report timer.

pub mod chirp;
pub mod water_level;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{PlantSensorPort, WaterLevelPort};
use crate::error::SensorError;
use crate::scheduler::lock;
use water_level::WaterLevel;

/// Highest temperature the probe can plausibly report.
pub const MAX_PLAUSIBLE_TEMPERATURE_C: f32 = 100.0;

/// The level ladder, shared between the sampler and the mode loops.
pub type SharedLevel = Arc<Mutex<dyn WaterLevelPort>>;

/// Wrap a ladder for sharing.
pub fn share_level(level: impl WaterLevelPort + 'static) -> SharedLevel {
    Arc::new(Mutex::new(level))
}

/// One probe reading before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantReading {
    /// Percent.
    pub moisture: f32,
    /// Celsius.
    pub temperature: f32,
    /// 0–100.
    pub luminosity: f32,
}

impl PlantReading {
    pub fn is_plausible(&self) -> bool {
        (0.0..=100.0).contains(&self.moisture)
            && self.temperature <= MAX_PLAUSIBLE_TEMPERATURE_C
            && self.luminosity.is_finite()
    }

    /// Pass a plausible reading through, reject the rest as out of range.
    pub fn checked(self) -> Result<Self, SensorError> {
        if self.is_plausible() {
            Ok(self)
        } else {
            debug!(
                "telemetry: rejected moisture={:.1}% temperature={:.1}C light={:.1}",
                self.moisture, self.temperature, self.luminosity
            );
            Err(SensorError::OutOfRange)
        }
    }
}

/// One accepted telemetry report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub temperature: f32,
    pub luminosity: f32,
    pub moisture: f32,
    pub water: WaterLevel,
    /// Unix seconds.
    pub timestamp: u64,
}

pub struct TelemetrySampler {
    probe: Box<dyn PlantSensorPort>,
    level: SharedLevel,
    settle: Duration,
    backoff: Duration,
}

impl TelemetrySampler {
    pub fn new(
        probe: impl PlantSensorPort + 'static,
        level: SharedLevel,
        settle: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            probe: Box::new(probe),
            level,
            settle,
            backoff,
        }
    }

    /// Block until the probe yields a plausible reading, then add the tank
    /// level.
    pub fn sample(&mut self) -> TelemetrySample {
        let mut attempt: u32 = 0;
        let reading = loop {
            attempt += 1;
            match self.measure_once().and_then(PlantReading::checked) {
                Ok(r) => break r,
                Err(e) => warn!("telemetry: {e}, retrying (attempt {attempt})"),
            }
            thread::sleep(self.backoff);
        };

        let water = lock(&self.level).read();
        let sample = TelemetrySample {
            temperature: reading.temperature,
            luminosity: reading.luminosity,
            moisture: reading.moisture,
            water,
            timestamp: unix_now(),
        };
        debug!("telemetry: {sample:?} after {attempt} attempt(s)");
        sample
    }

    fn measure_once(&mut self) -> Result<PlantReading, SensorError> {
        self.probe.wake()?;
        let reading = self.probe.start_measurement().and_then(|()| {
            thread::sleep(self.settle);
            self.probe.read()
        });
        if let Err(e) = self.probe.sleep() {
            warn!("telemetry: probe did not go to sleep ({e})");
        }
        reading
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
