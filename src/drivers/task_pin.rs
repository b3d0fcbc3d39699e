//! Core-pinned worker threads for the ESP32.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread` creates a FreeRTOS
//! task pinned to a specific CPU core with explicit priority and stack size.
//! On host targets it falls back to a plain named thread.
//!
//! `esp_pthread_set_cfg()` applies to the *next* `pthread_create()` issued by
//! the calling thread, so the config/spawn pair must not be interleaved with
//! other thread creation on the same thread.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers for the ESP32 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): WiFi and lwIP.
    Pro = 0,
    /// Core 1 (APP_CPU): pump, level ladder, LEDs.
    App = 1,
}

/// Per-role thread parameters.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

/// LED animation worker.
pub const LED_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 3,
    stack_kb: 4,
};

/// One-shot and periodic timers (pump shutoff, auto-clear, telemetry).
pub const TIMER_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 5,
    stack_kb: 6,
};

/// Fill / empty / watering mode loops.
pub const MODE_LOOP_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 4,
    stack_kb: 6,
};

/// Host threads get at least this much stack regardless of the firmware budget.
#[cfg(not(target_os = "espidf"))]
const HOST_MIN_STACK: usize = 256 * 1024;

/// Spawn a named thread with the given placement.
///
/// `name` must be null-terminated (e.g. `"leds\0"`); the terminator is
/// stripped for the Rust-side thread name.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    spec: TaskSpec,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    // SAFETY: cfg is fully initialised by esp_create_default_pthread_config and
    // thread_name points at a 'static null-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = name.trim_end_matches('\0');
    log::debug!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new().name(display_name.into()).spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    spec: TaskSpec,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::debug!("Spawning '{}' (sim, no core pinning)", display_name);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size((spec.stack_kb * 1024).max(HOST_MIN_STACK))
        .spawn(f)
}
