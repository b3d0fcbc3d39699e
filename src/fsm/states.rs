//! Mode table and per-mode entry actions.
//!
//! ```text
//!  BOOTING ──[hardware up]──▶ READY ──[first report]──▶ OK
//!
//!  OK ⇄ HOT / COLD / DROWNED / THIRSTY / TOO_DARK / TOO_BRIGHT / OUT_OF_WATER
//!        (alert in)              (report back inside the plant profile)
//!
//!  THIRSTY ──[auto]──▶ WATERING
//!
//!  any non-busy ──[doWater]────▶ WATERING ──[pump off]────▶ OK
//!  any non-busy ──[refillMode]─▶ FILLING  ──[tank Full]───▶ OK
//!  any non-busy ──[emptyWater]─▶ EMPTYING ──[tank Dry]────▶ OK
//! ```
//!
//! Alert modes show a persistent breathing gauge: one pixel for a
//! min-bound alert, the full bar for a max-bound one.

use super::{Mode, ModeDescriptor};
use crate::app::ports::FeedbackPort;
use crate::drivers::led_patterns::{
    COLOUR_COLD, COLOUR_DROWNED, COLOUR_HOT, COLOUR_OUT_OF_WATER, COLOUR_THIRSTY,
    COLOUR_TOO_BRIGHT, COLOUR_TOO_DARK, COLOUR_WATERING,
};

/// Gauge shown for a value below its range.
const LOW_GAUGE: f32 = 20.0;
/// Gauge shown for a value above its range.
const HIGH_GAUGE: f32 = 100.0;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table. Called once at startup.
pub fn build_mode_table() -> [ModeDescriptor; Mode::COUNT] {
    [
        row(Mode::Booting, "BOOTING", Some(booting_enter)),
        row(Mode::Ready, "READY", None),
        row(Mode::Ok, "OK", Some(ok_enter)),
        row(Mode::Hot, "HOT", Some(hot_enter)),
        row(Mode::Cold, "COLD", Some(cold_enter)),
        row(Mode::Drowned, "DROWNED", Some(drowned_enter)),
        row(Mode::Thirsty, "THIRSTY", Some(thirsty_enter)),
        row(Mode::TooDark, "TOO_DARK", Some(too_dark_enter)),
        row(Mode::TooBright, "TOO_BRIGHT", Some(too_bright_enter)),
        row(Mode::OutOfWater, "OUT_OF_WATER", Some(out_of_water_enter)),
        row(Mode::Watering, "WATERING", Some(watering_enter)),
        row(Mode::Emptying, "EMPTYING", Some(tank_mode_enter)),
        row(Mode::Filling, "FILLING", Some(tank_mode_enter)),
    ]
}

fn row(id: Mode, name: &'static str, on_enter: Option<super::EnterFn>) -> ModeDescriptor {
    ModeDescriptor { id, name, on_enter }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Entry actions
// ═══════════════════════════════════════════════════════════════════════════

fn booting_enter(fb: &dyn FeedbackPort) {
    fb.boot_animation();
}

fn ok_enter(fb: &dyn FeedbackPort) {
    fb.clear();
}

fn hot_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(HIGH_GAUGE, COLOUR_HOT, true);
}

fn cold_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(LOW_GAUGE, COLOUR_COLD, true);
}

fn drowned_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(HIGH_GAUGE, COLOUR_DROWNED, true);
}

fn thirsty_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(LOW_GAUGE, COLOUR_THIRSTY, true);
}

fn too_dark_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(LOW_GAUGE, COLOUR_TOO_DARK, true);
}

fn too_bright_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(HIGH_GAUGE, COLOUR_TOO_BRIGHT, true);
}

fn out_of_water_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(LOW_GAUGE, COLOUR_OUT_OF_WATER, true);
}

fn watering_enter(fb: &dyn FeedbackPort) {
    fb.display_meter(HIGH_GAUGE, COLOUR_WATERING, false);
}

/// Filling and emptying start from a blank bar; the mode loop mirrors the
/// level from there.
fn tank_mode_enter(fb: &dyn FeedbackPort) {
    fb.clear();
}
