//! JSON payload codec for the message bus.
//!
//! Topic routing lives in the bus adapter; this module only maps an event
//! name plus a JSON body to an [`Inbound`] command, and an [`Outbound`]
//! event back to a name plus body. Every payload carries `siteId` and may
//! carry `sessionId`.
//!
//! ```text
//! alert      {"siteId":"kitchen","metric":"moisture","bound":"min"}
//! refused    {"siteId":"kitchen","sessionId":"s1","request":"refillMode","mode":"WATERING"}
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use super::commands::{DeviceCommand, Inbound};
use super::events::{DeviceEvent, Outbound};
use crate::fsm::Mode;
use crate::fsm::alerts::{Alert, Bound, Metric};
use crate::sensors::TelemetrySample;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The event name is not a command this device understands.
    UnknownCommand,
    /// The body is not valid JSON or lacks `siteId`.
    Malformed,
    /// An `alert` is missing its metric or bound.
    MissingField(&'static str),
    /// An `alert` names a metric or bound that does not exist.
    InvalidField(&'static str),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::Malformed => write!(f, "malformed payload"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::InvalidField(name) => write!(f, "invalid field '{name}'"),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandBody {
    site_id: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    bound: Option<String>,
}

/// Decode one inbound command.
pub fn decode_command(name: &str, payload: &[u8]) -> Result<Inbound, WireError> {
    let body: CommandBody = serde_json::from_slice(payload).map_err(|_| WireError::Malformed)?;
    let command = match name {
        "doWater" => DeviceCommand::Water,
        "refillMode" => DeviceCommand::Refill,
        "emptyWater" => DeviceCommand::Empty,
        "alert" => {
            let metric: Metric = body
                .metric
                .as_deref()
                .ok_or(WireError::MissingField("metric"))?
                .parse()
                .map_err(|_| WireError::InvalidField("metric"))?;
            let bound: Bound = body
                .bound
                .as_deref()
                .ok_or(WireError::MissingField("bound"))?
                .parse()
                .map_err(|_| WireError::InvalidField("bound"))?;
            DeviceCommand::Alert(Alert::new(metric, bound))
        }
        _ => return Err(WireError::UnknownCommand),
    };
    Ok(Inbound {
        site_id: body.site_id,
        session_id: body.session_id,
        command,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    site_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a TelemetrySample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bound: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<Mode>,
}

/// Encode one outbound event as `(name, json)`.
pub fn encode_event(out: &Outbound) -> Result<(&'static str, Vec<u8>), WireError> {
    let mut body = EventBody {
        site_id: &out.site_id,
        session_id: out.session_id.as_deref(),
        data: None,
        metric: None,
        bound: None,
        request: None,
        mode: None,
        from: None,
    };
    match &out.event {
        DeviceEvent::TelemetryReport(sample) => body.data = Some(sample),
        DeviceEvent::RefillFull | DeviceEvent::WaterEmptied => {}
        DeviceEvent::Refused { request, mode } => {
            body.request = Some(*request);
            body.mode = Some(*mode);
        }
        DeviceEvent::AlertUser(alert) => {
            body.metric = Some(alert.metric);
            body.bound = Some(alert.bound);
        }
        DeviceEvent::ModeChanged { from, to } => {
            body.from = Some(*from);
            body.mode = Some(*to);
        }
    }
    let json = serde_json::to_vec(&body).map_err(|_| WireError::Malformed)?;
    Ok((out.event.name(), json))
}
