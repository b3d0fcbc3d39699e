//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every outbound event to the
//! ESP-IDF logger (UART / USB-CDC in production). The bus adapter that
//! publishes [`crate::app::wire`] payloads implements the same trait.

use log::info;

use crate::app::events::{DeviceEvent, Outbound};
use crate::app::ports::EventSink;

/// Adapter that logs every [`Outbound`] event to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, out: &Outbound) {
        let site = out.site_id.as_str();
        let session = out.session_id.as_deref().unwrap_or("-");
        match &out.event {
            DeviceEvent::TelemetryReport(s) => {
                info!(
                    "TELEM | site={} | moisture={:.1}% T={:.1}\u{00b0}C light={:.0} \
                     water={}% | ts={}",
                    site,
                    s.moisture,
                    s.temperature,
                    s.luminosity,
                    s.water.percent(),
                    s.timestamp,
                );
            }
            DeviceEvent::ModeChanged { from, to } => {
                info!("MODE  | site={} | {:?} -> {:?}", site, from, to);
            }
            DeviceEvent::Refused { request, mode } => {
                info!("REFUSE| site={} session={} | {} while {:?}", site, session, request, mode);
            }
            DeviceEvent::AlertUser(alert) => {
                info!("ALERT | site={} | {}", site, alert);
            }
            DeviceEvent::RefillFull | DeviceEvent::WaterEmptied => {
                info!("TANK  | site={} session={} | {}", site, session, out.event.name());
            }
        }
    }
}
