//! APA102 / DotStar bar driver over an `embedded-hal` SPI bus.
//!
//! Frame layout for [`PIXEL_COUNT`] pixels:
//!
//! ```text
//! 00 00 00 00 | E0|b5 B G R | ... | FF FF FF FF
//!  start        one per pixel       end
//! ```
//!
//! Global brightness rides in the 5-bit header of every pixel, so dimming
//! never throws away colour resolution.

use embedded_hal::spi::{Error as _, SpiBus};
use log::warn;

use crate::app::ports::PixelStrip;
use crate::drivers::led_patterns::{PIXEL_COUNT, Pixels};
use crate::error::ActuatorError;

/// Bytes in one complete frame.
pub const FRAME_LEN: usize = 4 + PIXEL_COUNT * 4 + 4;

/// Map 0.0–1.0 onto the 5-bit APA102 brightness field.
pub fn brightness_bits(brightness: f32) -> u8 {
    if !brightness.is_finite() {
        return 0;
    }
    (brightness.clamp(0.0, 1.0) * 31.0).round() as u8
}

/// Encode one frame.
pub fn encode_frame(pixels: &Pixels, brightness: f32) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    let header = 0xE0 | brightness_bits(brightness);
    for (i, &(r, g, b)) in pixels.iter().enumerate() {
        let at = 4 + i * 4;
        frame[at..at + 4].copy_from_slice(&[header, b, g, r]);
    }
    frame[FRAME_LEN - 4..].fill(0xFF);
    frame
}

/// A DotStar bar on a dedicated SPI bus.
pub struct DotStarStrip<SPI> {
    spi: SPI,
}

impl<SPI: SpiBus> DotStarStrip<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> PixelStrip for DotStarStrip<SPI>
where
    SPI: SpiBus + Send,
{
    fn show(&mut self, pixels: &Pixels, brightness: f32) -> Result<(), ActuatorError> {
        let frame = encode_frame(pixels, brightness);
        self.spi
            .write(&frame)
            .and_then(|()| self.spi.flush())
            .map_err(|e| {
                warn!("leds: SPI write failed ({:?})", e.kind());
                ActuatorError::SpiWriteFailed
            })
    }
}
