//! Flowerpot firmware library.
//!
//! Exposes the pure-logic modules for integration testing and simulation.
//! ESP-IDF-specific code is behind the `espidf` feature inside each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod scheduler;
pub mod sensors;
