//! Outbound device events.
//!
//! The [`DeviceService`](super::service::DeviceService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT,
//! record for a test.

use crate::fsm::Mode;
use crate::fsm::alerts::Alert;
use crate::sensors::TelemetrySample;

/// Structured events emitted by the device core.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Periodic telemetry report.
    TelemetryReport(TelemetrySample),

    /// A refill finished with the tank full.
    RefillFull,

    /// An emptying run finished with the tank dry.
    WaterEmptied,

    /// A command was rejected because of the current mode.
    Refused { request: &'static str, mode: Mode },

    /// The user should be told about an alert.
    AlertUser(Alert),

    /// The mode changed.
    ModeChanged { from: Mode, to: Mode },
}

impl DeviceEvent {
    /// Bus name of the event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TelemetryReport(_) => "telemetryReport",
            Self::RefillFull => "refillFull",
            Self::WaterEmptied => "waterEmptied",
            Self::Refused { .. } => "refused",
            Self::AlertUser(_) => "alertUser",
            Self::ModeChanged { .. } => "modeChanged",
        }
    }
}

/// An event plus its addressing.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub site_id: String,
    /// Session of the command this answers, if any.
    pub session_id: Option<String>,
    pub event: DeviceEvent,
}
