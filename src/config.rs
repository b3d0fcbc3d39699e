//! System configuration parameters
//!
//! All tunable parameters for the Flowerpot planter. Values arrive already
//! resolved from an external loader; the firmware only validates them.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Device identity string as carried on the message bus.
pub type SiteId = heapless::String<32>;

/// Human-readable plant name.
pub type PlantName = heapless::String<32>;

/// Safe ranges for one plant species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantProfile {
    pub name: PlantName,
    /// Soil moisture, percent.
    pub moisture_min: f32,
    pub moisture_max: f32,
    /// Air temperature at the probe, Celsius.
    pub temperature_min: f32,
    pub temperature_max: f32,
    /// Normalised light level, 0-100.
    pub luminosity_min: f32,
    pub luminosity_max: f32,
}

impl Default for PlantProfile {
    fn default() -> Self {
        let mut name = PlantName::new();
        let _ = name.push_str("generic houseplant");
        Self {
            name,
            moisture_min: 20.0,
            moisture_max: 80.0,
            temperature_min: 10.0,
            temperature_max: 32.0,
            luminosity_min: 10.0,
            luminosity_max: 90.0,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Identity the device answers to. Empty means derive it from the MAC.
    pub site_id: SiteId,

    // --- Pump ---
    /// Length of one watering burst (milliseconds)
    pub pump_duration_ms: u32,

    // --- Timing ---
    /// Tank level poll period while filling or emptying (milliseconds)
    pub level_poll_interval_ms: u32,
    /// Delay between energising the level ladder and sampling it (milliseconds)
    pub level_settle_ms: u32,
    /// Telemetry report interval (seconds)
    pub report_interval_secs: u32,
    /// Soil probe measurement settle time (milliseconds)
    pub sensor_settle_ms: u32,
    /// Delay before retrying a rejected soil sample (milliseconds)
    pub sensor_retry_backoff_ms: u32,
    /// Pause after a fill/empty cycle completes (milliseconds)
    pub mode_exit_hold_ms: u32,
    /// Auto-clear delay for non-alert meters (seconds)
    pub meter_auto_clear_secs: u32,

    // --- LED ---
    /// Peak brightness for meters and breathing (0, 1]
    pub led_brightness: f32,

    // --- Calibration ---
    /// Raw probe capacitance in bone-dry soil
    pub moisture_raw_min: u16,
    /// Raw probe capacitance in saturated soil
    pub moisture_raw_max: u16,

    // --- Plant ---
    pub plant: PlantProfile,
}

/// Accepted watering burst range. Longer bursts flood the pot.
pub const PUMP_DURATION_RANGE_MS: core::ops::RangeInclusive<u32> = 100..=5_000;

/// Accepted level poll period range.
pub const POLL_INTERVAL_RANGE_MS: core::ops::RangeInclusive<u32> = 10..=2_000;

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            site_id: SiteId::new(),

            // Pump
            pump_duration_ms: 5_000,

            // Timing
            level_poll_interval_ms: 250, // 4 Hz
            level_settle_ms: 5,
            report_interval_secs: 300, // 5 min
            sensor_settle_ms: 1_000,
            sensor_retry_backoff_ms: 500,
            mode_exit_hold_ms: 1_500,
            meter_auto_clear_secs: 10,

            // LED
            led_brightness: 1.0,

            // Calibration
            moisture_raw_min: 250,
            moisture_raw_max: 750,

            plant: PlantProfile::default(),
        }
    }
}

impl SystemConfig {
    /// Reject values the firmware cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if !PUMP_DURATION_RANGE_MS.contains(&self.pump_duration_ms) {
            return Err(Error::Config("pump_duration_ms out of range"));
        }
        if !POLL_INTERVAL_RANGE_MS.contains(&self.level_poll_interval_ms) {
            return Err(Error::Config("level_poll_interval_ms out of range"));
        }
        if self.report_interval_secs == 0 {
            return Err(Error::Config("report_interval_secs must be positive"));
        }
        if self.meter_auto_clear_secs == 0 {
            return Err(Error::Config("meter_auto_clear_secs must be positive"));
        }
        if !(self.led_brightness > 0.0 && self.led_brightness <= 1.0) {
            return Err(Error::Config("led_brightness must be in (0, 1]"));
        }
        if self.moisture_raw_min >= self.moisture_raw_max {
            return Err(Error::Config("moisture calibration min must be below max"));
        }
        let p = &self.plant;
        if p.moisture_min > p.moisture_max
            || p.temperature_min > p.temperature_max
            || p.luminosity_min > p.luminosity_max
        {
            return Err(Error::Config("plant profile min above max"));
        }
        Ok(())
    }

    pub fn pump_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.pump_duration_ms))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.level_poll_interval_ms))
    }

    pub fn level_settle(&self) -> Duration {
        Duration::from_millis(u64::from(self.level_settle_ms))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.report_interval_secs))
    }

    pub fn sensor_settle(&self) -> Duration {
        Duration::from_millis(u64::from(self.sensor_settle_ms))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(u64::from(self.sensor_retry_backoff_ms))
    }

    pub fn exit_hold(&self) -> Duration {
        Duration::from_millis(u64::from(self.mode_exit_hold_ms))
    }

    pub fn meter_auto_clear(&self) -> Duration {
        Duration::from_secs(u64::from(self.meter_auto_clear_secs))
    }
}
