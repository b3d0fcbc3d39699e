//! Application core — domain logic behind port traits.
//!
//! The mode machine, the watering/filling/emptying loops and the telemetry
//! schedule live in [`service`]. All interaction with hardware and the bus
//! happens through the traits in [`ports`], so this layer runs unchanged
//! against the mocks in `tests/integration`.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod wire;
