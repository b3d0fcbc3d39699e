//! Inbound commands to the device service.
//!
//! These arrive from the message bus (or the serial console) already
//! decoded by [`wire`](super::wire). The
//! [`DeviceService`](super::service::DeviceService) checks the addressing
//! and acts on the command.

use crate::fsm::alerts::Alert;

/// Commands that external adapters can send into the device core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Run the pump for one watering burst.
    Water,

    /// Mirror the tank level on the LEDs until it reads full.
    Refill,

    /// Pump the tank out until the ladder reads dry.
    Empty,

    /// The external validator saw a metric cross one of its bounds.
    Alert(Alert),
}

impl DeviceCommand {
    /// Bus name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "doWater",
            Self::Refill => "refillMode",
            Self::Empty => "emptyWater",
            Self::Alert(_) => "alert",
        }
    }
}

/// A command plus its addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Identity of the device the sender meant.
    pub site_id: String,
    /// Dialogue session to answer on, if any.
    pub session_id: Option<String>,
    pub command: DeviceCommand,
}

impl Inbound {
    pub fn new(site_id: impl Into<String>, command: DeviceCommand) -> Self {
        Self {
            site_id: site_id.into(),
            session_id: None,
            command,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
