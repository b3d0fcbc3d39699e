//! Actuator drivers, LED rendering, and worker-thread helpers.

pub mod gpio;
pub mod led_engine;
pub mod led_patterns;
pub mod led_strip;
pub mod pump;
pub mod task_pin;
