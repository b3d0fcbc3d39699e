//! Pixel maths and palette for the 5-pixel DotStar bar.
//!
//! The bar doubles as a gauge: each pixel stands for 20 %. Meters light
//! `round(pct / 20)` pixels; level mirrors light one pixel per ladder rung.
//!
//! ## Breathing
//!
//! Persistent meters oscillate their global brightness between
//! [`BREATH_FLOOR`] and the requested peak in [`BREATH_STEP`] increments.
//! The per-step delay is chosen so one half-cycle from the peak takes
//! roughly [`BREATH_HALF_CYCLE`].
//!
//! | Peak | Steps | Step delay |
//! |------|-------|------------|
//! | 1.0  | 25    | 100 ms     |
//! | 0.6  | 15    | 167 ms     |
//! | 0.4  | 10    | 250 ms     |

use core::time::Duration;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

/// Pixels on the bar.
pub const PIXEL_COUNT: usize = 5;

/// Gauge resolution of one pixel.
pub const PERCENT_PER_PIXEL: f32 = 100.0 / PIXEL_COUNT as f32;

/// Lowest brightness a breathing meter dims to.
pub const BREATH_FLOOR: f32 = 0.2;

/// Brightness change per breathing step.
pub const BREATH_STEP: f32 = 0.04;

/// Time to ramp from the peak to the floor (or back).
pub const BREATH_HALF_CYCLE: Duration = Duration::from_millis(2_500);

pub const OFF: Rgb = (0, 0, 0);

/// A full frame for the bar.
pub type Pixels = [Rgb; PIXEL_COUNT];

/// Number of pixels a meter at `percentage` lights, clamped to the bar.
pub fn pixels_for_percentage(percentage: f32) -> usize {
    if !percentage.is_finite() || percentage <= 0.0 {
        return 0;
    }
    ((percentage / PERCENT_PER_PIXEL).round() as usize).min(PIXEL_COUNT)
}

/// First `lit` pixels in `colour`, the rest off.
pub fn gauge(lit: usize, colour: Rgb) -> Pixels {
    let mut px = [OFF; PIXEL_COUNT];
    for p in px.iter_mut().take(lit) {
        *p = colour;
    }
    px
}

/// Triangle-wave brightness between [`BREATH_FLOOR`] and a peak.
#[derive(Debug, Clone, Copy)]
pub struct Breathing {
    peak: f32,
    level: f32,
    rising: bool,
}

impl Breathing {
    /// Start at `peak`, heading down.
    pub fn new(peak: f32) -> Self {
        let peak = peak.clamp(BREATH_FLOOR + BREATH_STEP, 1.0);
        Self {
            peak,
            level: peak,
            rising: false,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Advance one step and return the new brightness.
    pub fn next_level(&mut self) -> f32 {
        if self.level >= self.peak {
            self.rising = false;
        } else if self.level <= BREATH_FLOOR {
            self.rising = true;
        }
        let delta = if self.rising { BREATH_STEP } else { -BREATH_STEP };
        self.level = (self.level + delta).clamp(BREATH_FLOOR, self.peak);
        self.level
    }

    /// Delay between steps for this peak.
    pub fn step_interval(&self) -> Duration {
        let steps = (self.peak / BREATH_STEP).round().max(1.0);
        Duration::from_millis((BREATH_HALF_CYCLE.as_millis() as f32 / steps).round() as u64)
    }
}

// ── Palette ───────────────────────────────────────────────────

pub const COLOUR_BOOT: Rgb = (0, 0, 255); // Blue
pub const COLOUR_WATERING: Rgb = (0, 160, 255); // Sky
pub const COLOUR_FILLING: Rgb = (0, 60, 255); // Deep blue
pub const COLOUR_EMPTYING: Rgb = (255, 120, 0); // Amber
pub const COLOUR_EMPTIED: Rgb = (255, 0, 0); // Red
pub const COLOUR_HOT: Rgb = (255, 40, 0); // Orange-red
pub const COLOUR_COLD: Rgb = (120, 200, 255); // Ice
pub const COLOUR_DROWNED: Rgb = (0, 200, 200); // Cyan
pub const COLOUR_THIRSTY: Rgb = (255, 160, 0); // Amber
pub const COLOUR_TOO_DARK: Rgb = (128, 0, 255); // Purple
pub const COLOUR_TOO_BRIGHT: Rgb = (255, 230, 0); // Yellow
pub const COLOUR_OUT_OF_WATER: Rgb = (255, 0, 0); // Red
