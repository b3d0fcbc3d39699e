//! GPIO / peripheral pin assignments for the Flowerpot carrier board
//! (ESP32-DevKitC).
//!
//! Single source of truth for board bring-up. Change a pin here and
//! [`crate::adapters::hardware`] follows.

// ---------------------------------------------------------------------------
// Pump (logic-level MOSFET, active HIGH)
// ---------------------------------------------------------------------------

/// Digital output: HIGH = pump running.
pub const PUMP_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Tank level ladder
// ---------------------------------------------------------------------------

/// Digital output: powers the probe ladder while sampling (active HIGH).
/// Kept LOW between reads to limit electrode corrosion.
pub const LEVEL_ENABLE_GPIO: i32 = 26;

/// Rung inputs from the bottom of the tank to the top:
/// empty, quarter, half, three-quarter, full. HIGH = submerged.
///
/// GPIO 34-39 are input-only, which suits the rungs.
pub const LEVEL_RUNG_GPIOS: [i32; 5] = [34, 35, 36, 39, 32];

// ---------------------------------------------------------------------------
// DotStar (APA102) strip on SPI2
// ---------------------------------------------------------------------------

pub const LED_SPI_SCK_GPIO: i32 = 18;
pub const LED_SPI_MOSI_GPIO: i32 = 23;
/// APA102 tolerates far more; 4 MHz keeps the flat cable quiet.
pub const LED_SPI_FREQ_HZ: u32 = 4_000_000;

// ---------------------------------------------------------------------------
// I²C bus (soil probe)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// The probe clock-stretches badly above standard mode.
pub const I2C_FREQ_HZ: u32 = 100_000;
