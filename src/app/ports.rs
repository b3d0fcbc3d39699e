//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceService (domain)
//! ```
//!
//! Driven adapters (level ladder, soil probe, LED bar, event sinks) implement
//! these traits. The [`DeviceService`](super::service::DeviceService) holds
//! them as trait objects because its mode loops and timers run on their own
//! threads; every port is therefore `Send`.

use std::time::Duration;

use crate::app::events::Outbound;
use crate::drivers::led_patterns::{Pixels, Rgb};
use crate::error::{ActuatorError, SensorError};
use crate::sensors::PlantReading;
use crate::sensors::water_level::WaterLevel;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// The tank level ladder.
pub trait WaterLevelPort: Send {
    /// Energise the ladder, sample every rung, de-energise, quantise.
    fn read(&mut self) -> WaterLevel;

    /// Force the ladder's enable line to its safe (off) state.
    fn release(&mut self);
}

/// Moisture / temperature / light probe.
pub trait PlantSensorPort: Send {
    /// Bring the probe out of low-power mode.
    fn wake(&mut self) -> Result<(), SensorError>;

    /// Kick off a measurement cycle.
    fn start_measurement(&mut self) -> Result<(), SensorError>;

    /// Read the latest values. Out-of-range values are returned as-is;
    /// plausibility is judged by the sampler.
    fn read(&mut self) -> Result<PlantReading, SensorError>;

    /// Return the probe to low-power mode.
    fn sleep(&mut self) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Raw frame output for the pixel bar.
pub trait PixelStrip: Send {
    fn show(&mut self, pixels: &Pixels, brightness: f32) -> Result<(), ActuatorError>;
}

/// Visual feedback as the mode machine sees it.
///
/// All calls return promptly; rendering happens elsewhere.
pub trait FeedbackPort: Send + Sync {
    /// Boot sweep.
    fn boot_animation(&self);

    /// How long the boot sweep keeps the bar busy. Nothing should be
    /// drawn before it has run its course.
    fn boot_duration(&self) -> Duration {
        Duration::ZERO
    }

    /// Light the first `lit` pixels in `colour`, clear the rest.
    fn display_level(&self, lit: usize, colour: Rgb);

    /// Gauge of `percentage` followed by breathing. Non-alert meters
    /// auto-clear; alert meters persist until cleared or replaced.
    fn display_meter(&self, percentage: f32, colour: Rgb, auto_alert: bool);

    /// Stop any animation and blank the bar.
    fn clear(&self);

    /// Stop the renderer. Later calls are ignored.
    fn shutdown(&self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → message bus / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits addressed [`Outbound`] events through this port.
/// Adapters decide where they go (serial log, MQTT, test recorder).
pub trait EventSink: Send {
    fn emit(&mut self, event: &Outbound);
}
